//! Error types for tally-core

use thiserror::Error;

use crate::cell::{CellCapability, CellHandle};
use crate::event::OpExecutionStatus;
use crate::locator::CellLocator;
use crate::value::ValueType;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core
#[derive(Debug, Error)]
pub enum Error {
    /// An argument passed to a public entry point is invalid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid for the object's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A locator did not resolve to exactly one cell
    #[error(transparent)]
    CellNotFound(#[from] CellNotFoundError),

    /// A section-relative lookup was made from a cell that is not in the report
    #[error("The current cell {0} is not part of the report")]
    CurrentCellNotInReport(CellHandle),

    /// The report tree is malformed
    #[error("{message}")]
    Structural {
        message: String,
        #[source]
        source: StructuralConflict,
    },

    /// A value of the wrong type was supplied
    #[error("Invalid value type: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },

    /// The cell is disabled, so its value is not exposed
    #[error("Cell {0} is disabled")]
    CellDisabled(String),

    /// The cell does not hold a value
    #[error("Cell {0} does not have a value")]
    CellValueMissing(String),

    /// The cell's operation has not completed
    #[error("The operation of cell {cell} has not completed (status: {status})")]
    OpNotComplete {
        cell: String,
        status: OpExecutionStatus,
    },
}

impl Error {
    /// Create a structural error wrapping `conflict`
    pub fn structural<S: Into<String>>(message: S, conflict: StructuralConflict) -> Self {
        Error::Structural {
            message: message.into(),
            source: conflict,
        }
    }

    /// Create a new "invalid argument" error with a message
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a new "invalid operation" error with a message
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        Error::InvalidOperation(msg.into())
    }
}

/// A locator failed to resolve
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Could not find a cell using locator {locator}: {reason}")]
pub struct CellNotFoundError {
    /// The locator as it was given
    pub locator: CellLocator,
    /// Why resolution failed
    pub reason: NotFoundReason,
}

impl CellNotFoundError {
    pub fn new(locator: CellLocator, reason: NotFoundReason) -> Self {
        Self { locator, reason }
    }
}

/// Why a locator did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundReason {
    #[error("there is no section with id '{0}'")]
    SectionNotFound(String),

    #[error("no cell with id '{0}' was found")]
    NoMatchingCell(String),

    #[error("{count} cells have the id '{cell_id}'; the id must be unique")]
    AmbiguousCellId { cell_id: String, count: usize },

    #[error("a slot id was specified but the cell is not a slotted cell")]
    NotSlotted,

    #[error("the slotted cell does not have a slot with id '{0}'")]
    SlotNotFound(String),

    #[error("the cell is a slotted cell but no slot id was specified")]
    SlotIdNotSpecified,

    #[error("the cell is a {actual} cell, which does not support {expected}")]
    CapabilityMismatch {
        expected: CellCapability,
        actual: &'static str,
    },
}

/// The underlying conflict behind an [`Error::Structural`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralConflict {
    #[error("cell {0} is referenced more than once")]
    DuplicateCell(CellHandle),

    #[error("cell {0} does not exist in the report")]
    UnknownCell(CellHandle),

    #[error("section id '{0}' is used more than once")]
    DuplicateSectionId(String),

    #[error("row id '{0}' is used more than once in the table")]
    DuplicateRowId(String),

    #[error("there is no row with id '{0}'")]
    RowNotFound(String),

    #[error("slot '{slot_id}' of cell {cell} refers to another slotted cell")]
    NestedSlottedCell { cell: CellHandle, slot_id: String },

    #[error("default slot '{slot_id}' is not one of the slots of cell {cell}")]
    MissingDefaultSlot { cell: CellHandle, slot_id: String },

    #[error("{0} rows cannot have child rows")]
    FlatRowHasChildren(&'static str),

    #[error("row spans {actual} columns but the table has {expected}")]
    ColumnSpanMismatch { expected: usize, actual: usize },
}
