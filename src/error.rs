//! Error types for the sort operator.

use thiserror::Error;

use crate::cursor::RowId;
use crate::store::RunHandle;

/// Result type alias using SortError.
pub type Result<T> = std::result::Result<T, SortError>;

/// Failures surfaced by the sort operator and its collaborators.
///
/// The operator defines no failure modes of its own: every variant is either
/// a propagated collaborator failure (storage, schema, run store) or a
/// rejected configuration.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Schema errors
    #[error("Field not found: {field}")]
    FieldNotFound { field: String },

    #[error("Type mismatch for field {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Value too long for field {field}: {len} bytes (max {max})")]
    ValueTooLong {
        field: String,
        len: usize,
        max: usize,
    },

    // Run store errors
    #[error("Run store exhausted, unable to allocate a run beyond {capacity} live runs")]
    RunStoreExhausted { capacity: usize },

    #[error("Run not found: {0}")]
    RunNotFound(RunHandle),

    #[error("Run {handle} corrupted: {reason}")]
    RunCorrupted { handle: RunHandle, reason: String },

    // Cursor errors
    #[error("Row not found: {0}")]
    RowNotFound(RowId),

    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    // Operator errors
    #[error("Invalid sort configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} worker panicked")]
    WorkerPanicked(String),
}

impl SortError {
    pub fn field_not_found(field: impl Into<String>) -> Self {
        SortError::FieldNotFound {
            field: field.into(),
        }
    }
}
