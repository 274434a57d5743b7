//! Model clock: owns the iteration counter and the snapshot cadence.

use crate::{
    config::Configuration,
    types::{Iteration, ModelTime},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelClock {
    pub iteration:   Iteration,
    dt:              f64,
    budget:          Iteration,
    snapshot_stride: Iteration,
}

impl ModelClock {
    pub fn new(config: &Configuration) -> Self {
        Self {
            iteration:       0,
            dt:              config.dt(),
            budget:          config.iterations(),
            snapshot_stride: config.snapshot_stride(),
        }
    }

    /// Advance one iteration. Returns the new iteration number.
    /// Panics if the budget is already spent; callers must check.
    pub fn advance(&mut self) -> Iteration {
        assert!(!self.is_finished(), "advance() called on finished clock");
        self.iteration += 1;
        self.iteration
    }

    /// `iteration * dt`, in years.
    pub fn model_time(&self) -> ModelTime {
        self.iteration as f64 * self.dt
    }

    /// True when the current iteration lands on a snapshot boundary.
    pub fn is_snapshot_due(&self) -> bool {
        self.iteration > 0 && self.iteration.is_multiple_of(self.snapshot_stride)
    }

    pub fn is_finished(&self) -> bool {
        self.iteration >= self.budget
    }

    pub fn remaining(&self) -> Iteration {
        self.budget.saturating_sub(self.iteration)
    }

    pub fn budget(&self) -> Iteration {
        self.budget
    }
}
