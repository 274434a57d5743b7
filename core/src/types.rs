//! Shared primitive types used across the entire model.

/// A model iteration. One iteration = one explicit time step of `dt`.
pub type Iteration = u64;

/// Model time, in years.
pub type ModelTime = f64;

/// The canonical run identifier.
pub type RunId = String;
