//! flowline-core: a 1D shallow-ice flowline glacier model.
//!
//! One iteration is a two-stage explicit step: the flux field is computed
//! from the whole grid first, then every ice elevation is advanced from it.

pub mod boundary;
pub mod clock;
pub mod config;
pub mod consolidate;
pub mod engine;
pub mod error;
pub mod flux;
pub mod mass_balance;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod thickness;
pub mod types;
