//! The simulation loop.
//!
//! EXECUTION ORDER per iteration (fixed, never reordered):
//!   1. Advance the clock.
//!   2. Recompute the whole flux field from the current state.
//!   3. Sweep the thickness update over every grid point.
//!   4. If the clock lands on a snapshot boundary, emit a snapshot.
//!
//! RULES:
//!   - The flux field is complete before any elevation is written.
//!   - Snapshots read the finalized state of the current iteration.
//!   - The loop always runs the full budget; there is no convergence exit.
//!   - dt is never adjusted. Instability is reported, not corrected.

use crate::{
    clock::ModelClock,
    config::{Configuration, ModelParams},
    error::{FlowError, FlowResult},
    flux::{FluxCalculator, FluxField},
    mass_balance::MassBalanceModel,
    snapshot::{Snapshot, SnapshotSink},
    state::GridState,
    thickness::{StepReport, ThicknessUpdater},
    types::{Iteration, ModelTime},
};

/// Explicit diffusion is stable only while `D * dt / dx^2` stays below this.
pub const STABILITY_LIMIT: f64 = 0.5;

pub struct FlowEngine {
    pub config:   Configuration,
    pub clock:    ModelClock,
    state:        GridState,
    flux:         FluxField,
    report:       StepReport,
    mass_balance: Box<dyn MassBalanceModel>,
    unstable_reported: bool,
}

impl FlowEngine {
    pub fn new(
        config: Configuration,
        state: GridState,
        mass_balance: Box<dyn MassBalanceModel>,
    ) -> FlowResult<Self> {
        if state.len() != config.grid_points() {
            return Err(FlowError::GridMismatch {
                expected: config.grid_points(),
                actual:   state.len(),
            });
        }
        Ok(Self {
            clock:    ModelClock::new(&config),
            flux:     FluxField::zeros(config.edge_count()),
            report:   StepReport::default(),
            state,
            mass_balance,
            config,
            unstable_reported: false,
        })
    }

    /// Build a fully wired engine from parameters: validated configuration,
    /// initial profiles and the selected mass-balance model.
    pub fn build(params: &ModelParams) -> FlowResult<Self> {
        let config = Configuration::from_params(params)?;
        let state = GridState::from_specs(&config, &params.initial_ice, &params.bed)?;
        params.mass_balance.validate(config.grid_points())?;
        let mass_balance = params.mass_balance.clone().into_model();
        log::info!(
            "Flowline engine: N={} dx={:.1} m dt={} iterations={} mass_balance={}",
            config.grid_points(),
            config.dx(),
            config.dt(),
            config.iterations(),
            mass_balance.name(),
        );
        Self::new(config, state, mass_balance)
    }

    /// Advance one iteration. Returns the snapshot iteration if one was
    /// emitted to `sink`.
    ///
    /// # Panics
    ///
    /// Panics once the iteration budget is spent. Check `clock.is_finished()`
    /// first, or use [`FlowEngine::run_steps`], which never steps past it.
    pub fn step(&mut self, sink: &mut dyn SnapshotSink) -> FlowResult<Option<Iteration>> {
        let iteration = self.clock.advance();

        FluxCalculator::compute_into(&self.state, &self.config, &mut self.flux);
        ThicknessUpdater::apply_into(
            &mut self.state,
            &self.flux,
            &self.config,
            self.mass_balance.as_ref(),
            &mut self.report,
        );
        self.check_stability(iteration);

        if !self.clock.is_snapshot_due() {
            return Ok(None);
        }

        let snapshot = self.snapshot();
        sink.emit(&snapshot)?;
        log::debug!(
            "iteration={iteration} model_time={:.3} max_thickness={:.2} m",
            snapshot.model_time,
            self.state.max_thickness(),
        );
        Ok(Some(iteration))
    }

    /// Run up to `n` iterations, stopping early only if the budget runs out.
    /// Returns the number of snapshots emitted.
    pub fn run_steps(&mut self, n: Iteration, sink: &mut dyn SnapshotSink) -> FlowResult<usize> {
        let mut emitted = 0;
        for _ in 0..n.min(self.clock.remaining()) {
            if self.step(sink)?.is_some() {
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Run the whole remaining budget.
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> FlowResult<usize> {
        let remaining = self.clock.remaining();
        let emitted = self.run_steps(remaining, sink)?;
        log::info!(
            "Completed {} iterations, model time {:.1} yr, {emitted} snapshots",
            self.clock.iteration,
            self.model_time(),
        );
        Ok(emitted)
    }

    /// Record of the current state, as it would be emitted now.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            self.clock.iteration,
            self.model_time(),
            &self.state,
            &self.flux,
            &self.report,
            &self.config,
            self.mass_balance.as_ref(),
        )
    }

    pub fn model_time(&self) -> ModelTime {
        self.clock.model_time()
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    /// Flux field used by the most recent iteration.
    pub fn flux(&self) -> &FluxField {
        &self.flux
    }

    pub fn last_report(&self) -> &StepReport {
        &self.report
    }

    /// `max(D) * dt / dx^2` for the most recent flux field.
    pub fn stability_number(&self) -> f64 {
        let dx = self.config.dx();
        self.flux.max_diffusivity() * self.config.dt() / (dx * dx)
    }

    fn check_stability(&mut self, iteration: Iteration) {
        if self.unstable_reported {
            return;
        }
        let number = self.stability_number();
        let finite = self.state.ice_elevation().iter().all(|z| z.is_finite());
        if number > STABILITY_LIMIT || !finite {
            log::warn!(
                "iteration={iteration}: explicit step may be unstable \
                 (D*dt/dx^2 = {number:.3}, finite elevations: {finite}); continuing with dt unchanged"
            );
            self.unstable_reported = true;
        }
    }
}
