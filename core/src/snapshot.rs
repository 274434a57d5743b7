//! Snapshot records and the sinks that persist them.
//!
//! A snapshot is taken every `snapshot_stride` iterations (every 10 model
//! years in the baseline). Only ice elevation, bed elevation and edge flux
//! are filled from live state; the remaining diagnostic fields stay zero
//! unless the configuration enables diagnostics.

use crate::{
    config::Configuration,
    error::{FlowError, FlowResult},
    flux::FluxField,
    mass_balance::MassBalanceModel,
    state::GridState,
    thickness::{point_fluxes, StepReport},
    types::{Iteration, ModelTime},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(rename = "iceElevation")]
    pub ice_elevation:    f64,
    #[serde(rename = "bedElevation")]
    pub bed_elevation:    f64,
    pub diffusivity_up:   f64,
    pub flux_up:          f64,
    pub diffusivity_down: f64,
    pub flux_down:        f64,
    #[serde(rename = "totalFlux")]
    pub total_flux:       f64,
    #[serde(rename = "massBalanceFlux")]
    pub mass_balance_flux: f64,
    pub iteration:        Iteration,
    #[serde(rename = "deltaH")]
    pub delta_h:          f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidpointRecord {
    pub element_down: usize,
    pub element_up:   usize,
    pub diffusivity:  f64,
    pub slope:        f64,
    pub flux:         f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub iteration:  Iteration,
    pub model_time: ModelTime,
    pub elements:   Vec<ElementRecord>,
    pub midpoints:  Vec<MidpointRecord>,
}

impl Snapshot {
    /// Build a record from finalized state. `report` is the step that
    /// produced `state`; it is only read when diagnostics are enabled.
    pub fn capture(
        iteration: Iteration,
        model_time: ModelTime,
        state: &GridState,
        flux: &FluxField,
        report: &StepReport,
        config: &Configuration,
        mass_balance: &dyn MassBalanceModel,
    ) -> Self {
        let ice = state.ice_elevation();
        let bed = state.bed_elevation();

        let elements = if config.diagnostics() {
            (0..state.len())
                .map(|i| {
                    let (up, down) = point_fluxes(i, flux, config);
                    let mb = mass_balance.rate(i, config);
                    ElementRecord {
                        ice_elevation:     ice[i],
                        bed_elevation:     bed[i],
                        diffusivity_up:    if i > 0 { flux.diffusivity()[i - 1] } else { 0.0 },
                        flux_up:           -up,
                        diffusivity_down:  flux.diffusivity().get(i).copied().unwrap_or(0.0),
                        flux_down:         down,
                        total_flux:        (-up + down) / config.dx() + mb,
                        mass_balance_flux: mb,
                        iteration,
                        delta_h:           report.delta_h.get(i).copied().unwrap_or(0.0),
                    }
                })
                .collect()
        } else {
            (0..state.len())
                .map(|i| ElementRecord {
                    ice_elevation: ice[i],
                    bed_elevation: bed[i],
                    ..ElementRecord::default()
                })
                .collect()
        };

        let midpoints = (0..flux.len())
            .map(|i| {
                if config.diagnostics() {
                    let edge = flux.edge(i);
                    MidpointRecord {
                        element_down: i + 1,
                        element_up:   i,
                        diffusivity:  edge.diffusivity,
                        slope:        edge.slope,
                        flux:         edge.flux,
                    }
                } else {
                    MidpointRecord { flux: flux.flux()[i], ..MidpointRecord::default() }
                }
            })
            .collect();

        Self { iteration, model_time, elements, midpoints }
    }

    /// Whole model years, used to name snapshot files.
    pub fn label(&self) -> u64 {
        self.model_time.round().max(0.0) as u64
    }

    /// `data-0010.json` for model year 10.
    pub fn file_name(&self) -> String {
        format!("data-{:04}.json", self.label())
    }
}

/// Destination for emitted snapshots.
pub trait SnapshotSink {
    fn emit(&mut self, snapshot: &Snapshot) -> FlowResult<()>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn emit(&mut self, _snapshot: &Snapshot) -> FlowResult<()> {
        Ok(())
    }
}

/// Keeps serialized records in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<String>,
}

impl SnapshotSink for MemorySink {
    fn emit(&mut self, snapshot: &Snapshot) -> FlowResult<()> {
        self.records.push(serde_json::to_string(snapshot)?);
        Ok(())
    }
}

/// Writes one JSON file per snapshot into a directory.
///
/// Files are named by whole model years, so two snapshots of one run that
/// round to the same year are refused rather than overwritten.
#[derive(Debug)]
pub struct JsonDirSink {
    dir:     PathBuf,
    written: HashSet<String>,
}

impl JsonDirSink {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: impl AsRef<Path>) -> FlowResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: HashSet::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotSink for JsonDirSink {
    fn emit(&mut self, snapshot: &Snapshot) -> FlowResult<()> {
        let name = snapshot.file_name();
        if self.written.contains(&name) {
            return Err(FlowError::SnapshotCollision {
                file:      name,
                iteration: snapshot.iteration,
            });
        }
        let path = self.dir.join(&name);
        let json = serde_json::to_string(snapshot)?;
        std::fs::write(&path, json)?;
        self.written.insert(name);
        log::debug!("Snapshot written to {}", path.display());
        Ok(())
    }
}

/// Forwards every snapshot to each inner sink in order.
impl SnapshotSink for Vec<Box<dyn SnapshotSink>> {
    fn emit(&mut self, snapshot: &Snapshot) -> FlowResult<()> {
        for sink in self.iter_mut() {
            sink.emit(snapshot)?;
        }
        Ok(())
    }
}
