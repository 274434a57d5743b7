//! Nonlinear diffusive flux at the N - 1 edges between grid points.
//!
//! For edge i, between points i and i + 1:
//!
//! ```text
//! H     = (thickness[i] + thickness[i+1]) / 2
//! slope = (ice[i+1] - ice[i]) / dx
//! D     = Afl * H^(n+2) * |slope|^(n-1)
//! flux  = D * slope
//! ```
//!
//! The field is a pure function of the grid state. It is rebuilt from
//! scratch every iteration and nothing carries over between calls.

use crate::{config::Configuration, state::GridState};

/// Everything computed at a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeFlux {
    pub diffusivity: f64,
    pub slope:       f64,
    pub flux:        f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FluxField {
    flux:        Vec<f64>,
    diffusivity: Vec<f64>,
    slope:       Vec<f64>,
}

impl FluxField {
    /// All-zero field for a grid with `edges` edges.
    pub fn zeros(edges: usize) -> Self {
        Self {
            flux:        vec![0.0; edges],
            diffusivity: vec![0.0; edges],
            slope:       vec![0.0; edges],
        }
    }

    /// Number of edges, N - 1.
    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn diffusivity(&self) -> &[f64] {
        &self.diffusivity
    }

    pub fn slope(&self) -> &[f64] {
        &self.slope
    }

    pub fn edge(&self, i: usize) -> EdgeFlux {
        EdgeFlux {
            diffusivity: self.diffusivity[i],
            slope:       self.slope[i],
            flux:        self.flux[i],
        }
    }

    /// Largest diffusivity in the field. NaN entries are skipped.
    pub fn max_diffusivity(&self) -> f64 {
        self.diffusivity.iter().copied().fold(0.0, f64::max)
    }

    fn resize(&mut self, edges: usize) {
        self.flux.resize(edges, 0.0);
        self.diffusivity.resize(edges, 0.0);
        self.slope.resize(edges, 0.0);
    }

    fn set(&mut self, i: usize, edge: EdgeFlux) {
        self.flux[i] = edge.flux;
        self.diffusivity[i] = edge.diffusivity;
        self.slope[i] = edge.slope;
    }
}

/// Shallow-ice flux evaluation.
pub struct FluxCalculator;

impl FluxCalculator {
    /// Flux across one edge, from the elevations on its upstream (i) and
    /// downstream (i + 1) sides.
    #[inline]
    pub fn edge(
        config: &Configuration,
        ice_up: f64,
        bed_up: f64,
        ice_down: f64,
        bed_down: f64,
    ) -> EdgeFlux {
        let n = config.glen_exponent();
        let thickness_up = ice_up - bed_up;
        let thickness_down = ice_down - bed_down;

        let h = (thickness_up + thickness_down) / 2.0;
        let slope = (ice_down - ice_up) / config.dx();

        // |slope|^(n-1) is already 0 on a flat segment, and H^(n+2) is 0
        // where there is no ice, so neither case needs a branch.
        let diffusivity = config.afl() * h.powf(n + 2.0) * slope.abs().powf(n - 1.0);

        EdgeFlux {
            diffusivity,
            slope,
            flux: diffusivity * slope,
        }
    }

    /// Compute the full field for `state`.
    pub fn compute(state: &GridState, config: &Configuration) -> FluxField {
        let mut field = FluxField::zeros(state.len().saturating_sub(1));
        Self::compute_into(state, config, &mut field);
        field
    }

    /// Same as [`FluxCalculator::compute`], reusing `out`'s allocation.
    /// Every entry of `out` is overwritten.
    pub fn compute_into(state: &GridState, config: &Configuration, out: &mut FluxField) {
        let ice = state.ice_elevation();
        let bed = state.bed_elevation();
        let edges = state.len().saturating_sub(1);
        out.resize(edges);

        for i in 0..edges {
            let edge = Self::edge(config, ice[i], bed[i], ice[i + 1], bed[i + 1]);
            out.set(i, edge);
        }
    }
}
