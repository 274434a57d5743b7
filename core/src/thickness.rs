//! Explicit thickness update: one forward-Euler step of
//! `dH/dt = -div(q) + b`, swept over every grid point.
//!
//! The flux field must be fully computed from the previous state before
//! this runs; nothing here reads a value written in the same sweep except
//! the point being updated.

use crate::{
    boundary::Side,
    config::Configuration,
    flux::FluxField,
    mass_balance::MassBalanceModel,
    state::GridState,
};

/// What one update did, beyond the new elevations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Points whose new surface fell below the bed and were clamped to it.
    pub clamped_points: usize,
    /// Thickness removed by clamping, summed over all points (m).
    pub discarded_deficit: f64,
    /// Applied elevation change at each point, after clamping.
    pub delta_h: Vec<f64>,
}

/// Flux on the upstream and downstream edges of point `i`, with the
/// configured boundary policy standing in for the missing edge at each end.
pub fn point_fluxes(i: usize, flux: &FluxField, config: &Configuration) -> (f64, f64) {
    let last = config.grid_points() - 1;
    let flux = flux.flux();

    let upstream = if i == 0 {
        // The inner edge of point 0 is its downstream edge.
        let inner = flux.first().copied().unwrap_or(0.0);
        config.left_boundary().outer_flux(Side::Left, inner)
    } else {
        flux[i - 1]
    };

    let downstream = if i == last {
        config.right_boundary().outer_flux(Side::Right, upstream)
    } else {
        flux[i]
    };

    (upstream, downstream)
}

pub struct ThicknessUpdater;

impl ThicknessUpdater {
    /// Advance `state` by one time step and return what happened.
    pub fn apply(
        state: &mut GridState,
        flux: &FluxField,
        config: &Configuration,
        mass_balance: &dyn MassBalanceModel,
    ) -> StepReport {
        let mut report = StepReport::default();
        Self::apply_into(state, flux, config, mass_balance, &mut report);
        report
    }

    /// Same as [`ThicknessUpdater::apply`], reusing `report`'s allocation.
    pub fn apply_into(
        state: &mut GridState,
        flux: &FluxField,
        config: &Configuration,
        mass_balance: &dyn MassBalanceModel,
        report: &mut StepReport,
    ) {
        let n = config.grid_points();
        assert_eq!(state.len(), n, "grid state does not match configuration");
        assert_eq!(flux.len(), n - 1, "flux field does not match configuration");

        let dx = config.dx();
        let dt = config.dt();

        report.clamped_points = 0;
        report.discarded_deficit = 0.0;
        report.delta_h.clear();
        report.delta_h.resize(n, 0.0);

        let (ice, bed) = state.columns_mut();
        for i in 0..n {
            let (upstream, downstream) = point_fluxes(i, flux, config);
            let divergence = (-upstream + downstream) / dx;
            let change = (divergence + mass_balance.rate(i, config)) * dt;

            let old = ice[i];
            let mut new = old + change;
            if new < bed[i] {
                report.clamped_points += 1;
                report.discarded_deficit += bed[i] - new;
                new = bed[i];
            }

            report.delta_h[i] = new - old;
            ice[i] = new;
        }

        if report.clamped_points > 0 {
            log::trace!(
                "clamped {} points to bed, discarding {:.6} m of deficit",
                report.clamped_points,
                report.discarded_deficit
            );
        }
    }
}
