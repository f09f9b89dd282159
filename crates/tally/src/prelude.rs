//! Prelude module - common imports for tally users
//!
//! ```rust
//! use tally::prelude::*;
//! ```

pub use crate::{
    Availability,
    AvailabilityCheckChain,
    AvailabilityCheckStepAction,
    CellHandle,
    CellLocator,
    Column,
    CompareOperator,
    ConstCell,
    Decimal,
    // Error types
    Error,
    // Capability traits
    HasAvailabilityCheck,
    HasOperationOutput,
    HasValidation,
    InputCell,
    NullCell,
    // Op trees
    Op,
    OpExecutionStatus,
    OperationCell,
    // Extension ops
    ProtocolFactory,
    ProtocolRegistry,
    RecalcError,
    // Recalculation
    RecalcOptions,
    RecalcStats,
    // Report tree
    Report,
    ReportAgent,
    Row,
    Section,
    SlottedCell,
    Step,
    StepCondition,
    TreeTable,
    ValidationChain,
    ValidationStatus,
    ValidationStepAction,
    Validity,
    Value,
    ValueType,
};

pub use chrono::Utc;
