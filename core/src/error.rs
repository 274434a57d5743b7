use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Grid size mismatch: expected {expected} points, got {actual}")]
    GridMismatch { expected: usize, actual: usize },

    #[error("Snapshot {file} already written this run (iteration {iteration})")]
    SnapshotCollision { file: String, iteration: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FlowError::InvalidConfig { field, reason: reason.into() }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
