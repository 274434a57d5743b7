//! Grid state: ice-surface and bed elevations at every grid point.
//!
//! The bed is fixed at construction. Ice elevation is only written by the
//! thickness updater, which keeps `ice >= bed` at every point.

use crate::{
    config::Configuration,
    error::{FlowError, FlowResult},
};
use serde::{Deserialize, Serialize};

/// Description of an initial elevation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileSpec {
    Flat { elevation: f64 },
    /// Straight line from the first to the last point.
    Linear { start: f64, end: f64 },
    Values { values: Vec<f64> },
}

impl Default for ProfileSpec {
    fn default() -> Self {
        ProfileSpec::Flat { elevation: 0.0 }
    }
}

impl ProfileSpec {
    pub fn build(&self, grid_points: usize) -> FlowResult<Vec<f64>> {
        match self {
            ProfileSpec::Flat { elevation } => Ok(vec![*elevation; grid_points]),
            ProfileSpec::Linear { start, end } => {
                let last = grid_points.saturating_sub(1).max(1) as f64;
                Ok((0..grid_points)
                    .map(|i| start + (end - start) * i as f64 / last)
                    .collect())
            }
            ProfileSpec::Values { values } => {
                if values.len() != grid_points {
                    return Err(FlowError::GridMismatch {
                        expected: grid_points,
                        actual:   values.len(),
                    });
                }
                Ok(values.clone())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    ice_elevation: Vec<f64>,
    bed_elevation: Vec<f64>,
}

impl GridState {
    /// Zero bed, zero ice.
    pub fn flat(config: &Configuration) -> Self {
        let n = config.grid_points();
        Self {
            ice_elevation: vec![0.0; n],
            bed_elevation: vec![0.0; n],
        }
    }

    /// Build from explicit profiles. Ice below the bed is raised to the bed.
    pub fn from_profiles(
        config: &Configuration,
        mut ice: Vec<f64>,
        bed: Vec<f64>,
    ) -> FlowResult<Self> {
        let n = config.grid_points();
        for len in [ice.len(), bed.len()] {
            if len != n {
                return Err(FlowError::GridMismatch { expected: n, actual: len });
            }
        }

        let mut raised = 0usize;
        for (surface, floor) in ice.iter_mut().zip(&bed) {
            if *surface < *floor {
                *surface = *floor;
                raised += 1;
            }
        }
        if raised > 0 {
            log::warn!("{raised} initial ice elevations were below the bed and were raised to it");
        }

        Ok(Self { ice_elevation: ice, bed_elevation: bed })
    }

    pub fn from_specs(
        config: &Configuration,
        ice: &ProfileSpec,
        bed: &ProfileSpec,
    ) -> FlowResult<Self> {
        let n = config.grid_points();
        Self::from_profiles(config, ice.build(n)?, bed.build(n)?)
    }

    /// Number of grid points, N.
    pub fn len(&self) -> usize {
        self.ice_elevation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ice_elevation.is_empty()
    }

    pub fn ice_elevation(&self) -> &[f64] {
        &self.ice_elevation
    }

    pub fn bed_elevation(&self) -> &[f64] {
        &self.bed_elevation
    }

    pub fn thickness(&self, i: usize) -> f64 {
        self.ice_elevation[i] - self.bed_elevation[i]
    }

    pub fn max_thickness(&self) -> f64 {
        (0..self.len()).map(|i| self.thickness(i)).fold(0.0, f64::max)
    }

    /// Ice cross-section area per unit width (m^2): sum of thickness * dx.
    pub fn ice_volume(&self, config: &Configuration) -> f64 {
        (0..self.len()).map(|i| self.thickness(i)).sum::<f64>() * config.dx()
    }

    /// Split borrow for the updater: bed is read-only, ice is writable.
    pub(crate) fn columns_mut(&mut self) -> (&mut [f64], &[f64]) {
        (self.ice_elevation.as_mut_slice(), self.bed_elevation.as_slice())
    }
}
