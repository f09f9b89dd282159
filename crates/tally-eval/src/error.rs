//! Evaluation error types
//!
//! Evaluation distinguishes two kinds of errors. Soft errors ([`OpError::Aborted`],
//! [`OpError::NotApplicable`], [`OpError::Failed`]) unwind the computation
//! they occur in and become recorded outcomes. Everything else is fatal and
//! abandons the whole recalculation pass.

use tally_core::{CellNotFoundError, Concern, ValueType};
use thiserror::Error;

/// Result type for op evaluation
pub type OpResult<T> = std::result::Result<T, OpError>;

/// Errors that can occur while evaluating an op
#[derive(Debug, Error)]
pub enum OpError {
    /// The computation was aborted
    #[error("Aborted: {}", .message.as_deref().unwrap_or("no message"))]
    Aborted { message: Option<String> },

    /// The computation does not apply in the current state
    #[error("Not applicable: {}", .message.as_deref().unwrap_or("no message"))]
    NotApplicable { message: Option<String> },

    /// An extension protocol reported a failure
    #[error("Failed: {details}")]
    Failed { details: String },

    /// Division by a zero denominator
    #[error("Attempted to divide by zero")]
    DivideByZero,

    /// Arithmetic overflow
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A value did not have the type the op requires
    #[error("Type mismatch in {op}: expected {expected}, got {actual}")]
    TypeMismatch {
        op: &'static str,
        expected: ValueType,
        actual: ValueType,
    },

    /// A cell's concern depends on itself
    #[error("Circular reference: the {concern} of cell {cell} depends on itself")]
    CircularReference { cell: String, concern: Concern },

    /// Cell references nest deeper than allowed
    #[error("Cell references nest deeper than {0} levels")]
    DepthExceeded(usize),

    /// No protocol is registered for an extension op
    #[error("No protocol registered for op kind '{kind}' returning {return_type}")]
    NoProtocol { kind: String, return_type: ValueType },

    /// Error from the report model (lookups, structure)
    #[error(transparent)]
    Report(#[from] tally_core::Error),
}

/// A soft error, in the shape it is recorded in event logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftOutcome {
    Aborted(Option<String>),
    NotApplicable(Option<String>),
    Failed(String),
}

impl OpError {
    pub fn aborted<S: Into<String>>(message: S) -> Self {
        OpError::Aborted {
            message: Some(message.into()),
        }
    }

    pub fn not_applicable<S: Into<String>>(message: S) -> Self {
        OpError::NotApplicable {
            message: Some(message.into()),
        }
    }

    pub fn failed<S: Into<String>>(details: S) -> Self {
        OpError::Failed {
            details: details.into(),
        }
    }

    /// Check if this error is recorded as an outcome instead of ending the pass
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            OpError::Aborted { .. } | OpError::NotApplicable { .. } | OpError::Failed { .. }
        )
    }

    /// Split soft errors from fatal ones
    pub fn into_soft(self) -> Result<SoftOutcome, OpError> {
        match self {
            OpError::Aborted { message } => Ok(SoftOutcome::Aborted(message)),
            OpError::NotApplicable { message } => Ok(SoftOutcome::NotApplicable(message)),
            OpError::Failed { details } => Ok(SoftOutcome::Failed(details)),
            fatal => Err(fatal),
        }
    }
}

impl From<CellNotFoundError> for OpError {
    fn from(err: CellNotFoundError) -> Self {
        OpError::Report(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_soft() {
        assert_eq!(
            OpError::aborted("stop").into_soft().unwrap(),
            SoftOutcome::Aborted(Some("stop".into()))
        );
        assert!(matches!(
            OpError::DivideByZero.into_soft(),
            Err(OpError::DivideByZero)
        ));
        assert!(!OpError::DepthExceeded(3).is_soft());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            OpError::NotApplicable { message: None }.to_string(),
            "Not applicable: no message"
        );
        assert_eq!(OpError::aborted("x").to_string(), "Aborted: x");
    }
}
