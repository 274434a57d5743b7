//! Surface mass balance: a pure function of grid index.
//!
//! Positive rates accumulate ice, negative rates ablate it (m/yr of
//! thickness). Models carry no mutable state; the solver only ever sees
//! `&dyn MassBalanceModel`.

use crate::{
    config::Configuration,
    error::{FlowError, FlowResult},
};
use serde::{Deserialize, Serialize};

pub trait MassBalanceModel: Send {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Forcing rate at grid point `index`, `0 <= index < N`.
    fn rate(&self, index: usize, config: &Configuration) -> f64;
}

/// Ad-hoc forcing: any `Fn(index, &Configuration) -> rate`.
impl<F> MassBalanceModel for F
where
    F: Fn(usize, &Configuration) -> f64 + Send,
{
    fn name(&self) -> &'static str { "custom" }

    fn rate(&self, index: usize, config: &Configuration) -> f64 {
        self(index, config)
    }
}

/// `peak_rate - (i / (decay_fraction * N))^3`.
///
/// Positive near the head of the flowline, crossing into ablation a little
/// past `decay_fraction` of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicMassBalance {
    pub peak_rate:      f64,
    pub decay_fraction: f64,
}

impl Default for CubicMassBalance {
    fn default() -> Self {
        Self { peak_rate: 2.0, decay_fraction: 0.4 }
    }
}

impl MassBalanceModel for CubicMassBalance {
    fn name(&self) -> &'static str { "cubic" }

    fn rate(&self, index: usize, config: &Configuration) -> f64 {
        let scale = self.decay_fraction * config.grid_points() as f64;
        self.peak_rate - (index as f64 / scale).powi(3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantMassBalance(pub f64);

impl MassBalanceModel for ConstantMassBalance {
    fn name(&self) -> &'static str { "constant" }

    fn rate(&self, _index: usize, _config: &Configuration) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZeroMassBalance;

impl MassBalanceModel for ZeroMassBalance {
    fn name(&self) -> &'static str { "zero" }

    fn rate(&self, _index: usize, _config: &Configuration) -> f64 {
        0.0
    }
}

/// Per-point rates from a table. Points past the end of the table get 0;
/// `FlowEngine::build` requires the table to cover the whole grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMassBalance(pub Vec<f64>);

impl MassBalanceModel for ProfileMassBalance {
    fn name(&self) -> &'static str { "profile" }

    fn rate(&self, index: usize, _config: &Configuration) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }
}

/// Serializable selector for the models above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MassBalanceSpec {
    Cubic { peak_rate: f64, decay_fraction: f64 },
    Constant { rate: f64 },
    Zero,
    /// One rate per grid point; the length must equal `grid_points`.
    Profile { rates: Vec<f64> },
}

impl Default for MassBalanceSpec {
    fn default() -> Self {
        let cubic = CubicMassBalance::default();
        MassBalanceSpec::Cubic {
            peak_rate:      cubic.peak_rate,
            decay_fraction: cubic.decay_fraction,
        }
    }
}

impl MassBalanceSpec {
    /// Checks that a rate table, if any, has one entry per grid point.
    pub fn validate(&self, grid_points: usize) -> FlowResult<()> {
        match self {
            MassBalanceSpec::Profile { rates } if rates.len() != grid_points => {
                Err(FlowError::GridMismatch { expected: grid_points, actual: rates.len() })
            }
            _ => Ok(()),
        }
    }

    pub fn into_model(self) -> Box<dyn MassBalanceModel> {
        match self {
            MassBalanceSpec::Cubic { peak_rate, decay_fraction } => {
                Box::new(CubicMassBalance { peak_rate, decay_fraction })
            }
            MassBalanceSpec::Constant { rate } => Box::new(ConstantMassBalance(rate)),
            MassBalanceSpec::Zero => Box::new(ZeroMassBalance),
            MassBalanceSpec::Profile { rates } => Box::new(ProfileMassBalance(rates)),
        }
    }
}
