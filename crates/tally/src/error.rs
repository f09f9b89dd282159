//! Error types for recalculation

use tally_core::Concern;
use tally_eval::OpError;
use thiserror::Error;

/// Result type for recalculation
pub type RecalcResult<T> = std::result::Result<T, RecalcError>;

/// Errors that abandon a recalculation pass
#[derive(Debug, Error)]
pub enum RecalcError {
    /// An argument passed to a recalc entry point is invalid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Deriving a concern of a cell failed fatally
    #[error("Failed to derive the {concern} of cell {cell}: {source}")]
    Evaluation {
        cell: String,
        concern: Concern,
        #[source]
        source: OpError,
    },

    /// Error from the report model
    #[error(transparent)]
    Report(#[from] tally_core::Error),
}

impl RecalcError {
    /// The evaluation error that ended the pass, if any
    pub fn op_error(&self) -> Option<&OpError> {
        match self {
            RecalcError::Evaluation { source, .. } => Some(source),
            _ => None,
        }
    }
}
