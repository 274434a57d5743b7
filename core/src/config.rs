//! Model configuration.
//!
//! `ModelParams` is the serde-facing description (JSON file or defaults).
//! `Configuration` is the validated, immutable set of constants the solver
//! runs on. It is built once and never mutated.

use crate::{
    boundary::BoundaryCondition,
    error::{FlowError, FlowResult},
    mass_balance::MassBalanceSpec,
    state::ProfileSpec,
    types::Iteration,
};
use serde::{Deserialize, Serialize};

/// Meters per kilometer; domain length is given in km, spacing is in m.
pub const METERS_PER_KM: f64 = 1000.0;

/// Longest snapshot stride searched for before an interval is rejected.
pub const MAX_SNAPSHOT_STRIDE: Iteration = 1_000_000;

/// Allowed distance of `k * dt / interval` from a whole number.
const STRIDE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Flowline length in kilometers.
    pub model_length_km: f64,
    pub grid_points: usize,
    /// Glen's flow-rate factor A (Pa^-n yr^-1).
    pub flow_rate_factor: f64,
    /// Ice density (kg/m^3).
    pub ice_density: f64,
    pub gravity: f64,
    /// Glen's exponent n.
    pub glen_exponent: f64,
    /// Time step in years.
    pub time_step: f64,
    pub iterations: Iteration,
    /// Model-time years between snapshots.
    pub snapshot_interval: f64,
    pub left_boundary: BoundaryCondition,
    pub right_boundary: BoundaryCondition,
    pub mass_balance: MassBalanceSpec,
    pub initial_ice: ProfileSpec,
    pub bed: ProfileSpec,
    /// Fill the per-point / per-edge diagnostic fields of each snapshot.
    pub diagnostics: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model_length_km:   100.0,
            grid_points:       200,
            flow_rate_factor:  3e-16,
            ice_density:       917.0,
            gravity:           9.81,
            glen_exponent:     3.0,
            time_step:         1.0 / 200.0,
            iterations:        1_000_000,
            snapshot_interval: 10.0,
            left_boundary:     BoundaryCondition::Closed,
            right_boundary:    BoundaryCondition::Closed,
            mass_balance:      MassBalanceSpec::default(),
            initial_ice:       ProfileSpec::default(),
            bed:               ProfileSpec::default(),
            diagnostics:       false,
        }
    }
}

impl ModelParams {
    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let params: ModelParams = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(params)
    }
}

/// Validated model constants. Construct with [`Configuration::from_params`].
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    model_length_km:   f64,
    grid_points:       usize,
    dx:                f64,
    flow_rate_factor:  f64,
    ice_density:       f64,
    gravity:           f64,
    glen_exponent:     f64,
    afl:               f64,
    dt:                f64,
    iterations:        Iteration,
    snapshot_interval: f64,
    snapshot_stride:   Iteration,
    left_boundary:     BoundaryCondition,
    right_boundary:    BoundaryCondition,
    diagnostics:       bool,
}

impl Configuration {
    pub fn from_params(params: &ModelParams) -> FlowResult<Self> {
        if params.grid_points < 2 {
            return Err(FlowError::invalid(
                "grid_points",
                format!("must be at least 2, got {}", params.grid_points),
            ));
        }
        if !(params.model_length_km.is_finite() && params.model_length_km > 0.0) {
            return Err(FlowError::invalid(
                "model_length_km",
                format!("must be positive so that dx > 0, got {}", params.model_length_km),
            ));
        }
        if !(params.time_step.is_finite() && params.time_step > 0.0) {
            return Err(FlowError::invalid(
                "time_step",
                format!("must be positive, got {}", params.time_step),
            ));
        }
        if !(params.snapshot_interval.is_finite() && params.snapshot_interval > 0.0) {
            return Err(FlowError::invalid(
                "snapshot_interval",
                format!("must be positive, got {}", params.snapshot_interval),
            ));
        }
        if !(params.glen_exponent.is_finite() && params.glen_exponent > 0.0) {
            return Err(FlowError::invalid(
                "glen_exponent",
                format!("must be positive, got {}", params.glen_exponent),
            ));
        }

        let n = params.glen_exponent;
        let dx = params.model_length_km / (params.grid_points - 1) as f64 * METERS_PER_KM;
        let afl = (2.0 * params.flow_rate_factor / (n + 2.0))
            * (params.ice_density * params.gravity).powf(n);

        let snapshot_stride = snapshot_stride(params.time_step, params.snapshot_interval)
            .ok_or_else(|| {
                FlowError::invalid(
                    "snapshot_interval",
                    format!(
                        "no model time k * {} within {MAX_SNAPSHOT_STRIDE} iterations is a \
                         multiple of {}",
                        params.time_step, params.snapshot_interval
                    ),
                )
            })?;

        log::debug!(
            "configuration: N={} dx={dx:.3} m dt={} Afl={afl:e} stride={snapshot_stride}",
            params.grid_points,
            params.time_step,
        );

        Ok(Self {
            model_length_km:   params.model_length_km,
            grid_points:       params.grid_points,
            dx,
            flow_rate_factor:  params.flow_rate_factor,
            ice_density:       params.ice_density,
            gravity:           params.gravity,
            glen_exponent:     n,
            afl,
            dt:                params.time_step,
            iterations:        params.iterations,
            snapshot_interval: params.snapshot_interval,
            snapshot_stride,
            left_boundary:     params.left_boundary,
            right_boundary:    params.right_boundary,
            diagnostics:       params.diagnostics,
        })
    }

    /// Baseline constants on a small grid with a short budget, for tests.
    pub fn default_test() -> Self {
        let params = ModelParams {
            model_length_km: 10.0,
            grid_points:     21,
            iterations:      4_000,
            ..ModelParams::default()
        };
        match Self::from_params(&params) {
            Ok(config) => config,
            Err(e) => unreachable!("test defaults are valid: {e}"),
        }
    }

    pub fn model_length_km(&self) -> f64     { self.model_length_km }
    pub fn grid_points(&self) -> usize       { self.grid_points }
    /// Number of inter-point edges, N - 1.
    pub fn edge_count(&self) -> usize        { self.grid_points - 1 }
    /// Grid spacing in meters.
    pub fn dx(&self) -> f64                  { self.dx }
    pub fn flow_rate_factor(&self) -> f64    { self.flow_rate_factor }
    pub fn ice_density(&self) -> f64         { self.ice_density }
    pub fn gravity(&self) -> f64             { self.gravity }
    pub fn glen_exponent(&self) -> f64       { self.glen_exponent }
    /// Diffusivity coefficient `(2A / (n + 2)) * (rho * g)^n`.
    pub fn afl(&self) -> f64                 { self.afl }
    pub fn dt(&self) -> f64                  { self.dt }
    pub fn iterations(&self) -> Iteration    { self.iterations }
    pub fn snapshot_interval(&self) -> f64   { self.snapshot_interval }
    /// Iterations between snapshots.
    pub fn snapshot_stride(&self) -> Iteration { self.snapshot_stride }
    pub fn left_boundary(&self) -> BoundaryCondition  { self.left_boundary }
    pub fn right_boundary(&self) -> BoundaryCondition { self.right_boundary }
    pub fn diagnostics(&self) -> bool        { self.diagnostics }
}

/// Smallest `k >= 1` for which `k * dt` is a whole multiple of `interval`.
///
/// Snapshot cadence lives in iteration space so that rounding in `t * dt`
/// can never skip an emission or emit off the interval grid.
fn snapshot_stride(dt: f64, interval: f64) -> Option<Iteration> {
    (1..=MAX_SNAPSHOT_STRIDE).find(|&k| {
        let ratio = k as f64 * dt / interval;
        let whole = ratio.round();
        whole >= 1.0 && (ratio - whole).abs() <= STRIDE_TOLERANCE
    })
}
