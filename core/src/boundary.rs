//! Boundary policies for the two ends of the flowline.
//!
//! Fluxes use the `FluxField` sign convention (`flux = D * slope`), so a
//! negative value moves ice toward increasing x.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Left end: nothing enters across the outer edge.
    /// Right end: the outer edge carries the same flux as the inner edge,
    /// so the last point sees zero net transport.
    #[default]
    Closed,
    /// The outer edge carries a constant flux.
    FixedFlux { flux: f64 },
}

impl BoundaryCondition {
    /// Flux across the outer edge of the end point on `side`, given the
    /// flux across that same point's inner edge.
    pub fn outer_flux(&self, side: Side, inner_flux: f64) -> f64 {
        match (self, side) {
            (Self::Closed, Side::Left)  => 0.0,
            (Self::Closed, Side::Right) => inner_flux,
            (Self::FixedFlux { flux }, _) => *flux,
        }
    }
}
