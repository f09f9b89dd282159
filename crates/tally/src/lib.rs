//! # tally
//!
//! A report recalculation engine.
//!
//! A report is a tree of sections, each holding a tree-table of cells.
//! Input cells take values from outside; operation cells compute values
//! from op trees; any cell may carry a validation and an availability
//! check. A recalculation pass derives all of them again and appends the
//! outcomes to each cell's event log.
//!
//! ## Features
//!
//! - Const, input, operation, null and slotted cells
//! - Built-in ops for logic, arithmetic, comparisons and cell references
//! - Validation and availability check step pipelines
//! - Extension ops executed by user protocols, which may be async
//! - Append-only, timestamped event history per cell and concern
//!
//! ## Example
//!
//! ```rust
//! use tally::prelude::*;
//!
//! let mut report = Report::new("example");
//! let input = report.add_cell(InputCell::new(ValueType::Decimal).with_id("input"));
//! let half = report.add_cell(
//!     OperationCell::new(Op::divide(
//!         Op::get_value(CellLocator::section("input"), ValueType::Decimal),
//!         Op::constant(2i64),
//!     ))
//!     .unwrap()
//!     .with_id("half"),
//! );
//! report.add_section(Section::new(
//!     "main",
//!     TreeTable::new(vec![Column::new("value")])
//!         .with_data_row(Row::with_cells(vec![input]))
//!         .with_data_row(Row::with_cells(vec![half])),
//! ));
//!
//! let mut agent = ReportAgent::new(report).unwrap();
//! agent.set_input_value(input, Utc::now(), Decimal::from(5)).unwrap();
//! agent.recalc(&Utc::now(), &[]).unwrap();
//!
//! assert_eq!(
//!     agent.get_cell_value(half).unwrap(),
//!     &Value::Decimal(Decimal::new(25, 1))
//! );
//! ```

pub mod agent;
pub mod error;
pub mod prelude;
pub mod recalculation;

pub use agent::ReportAgent;
pub use error::{RecalcError, RecalcResult};
pub use recalculation::{RecalcOptions, RecalcStats};

// Re-export core types
pub use tally_core::{
    Availability,
    AvailabilityCheck,
    AvailabilityCheckChain,
    AvailabilityCheckOutcome,
    AvailabilityCheckStatus,
    AvailabilityCheckStepAction,
    Cell,
    CellCapability,
    CellHandle,
    CellLocator,
    CellNotFoundError,
    Column,
    CompareOperator,
    Concern,
    ConstCell,
    CustomOp,
    Decimal,
    Error,
    Event,
    EventLog,
    HasAvailabilityCheck,
    HasOperationOutput,
    HasValidation,
    InReportCellLocator,
    InputCell,
    InputOutcome,
    NotFoundReason,
    NotSlottedCell,
    NullCell,
    Op,
    OpExecutionOutcome,
    OpExecutionStatus,
    OperationCell,
    Report,
    ReportCache,
    ReportWideLocator,
    Result,
    Row,
    Section,
    SectionCellLocator,
    SlotSelectionStrategy,
    SlottedCell,
    StandardCellLocator,
    Step,
    StepCondition,
    StructuralConflict,
    TreeTable,
    Validation,
    ValidationChain,
    ValidationOutcome,
    ValidationStatus,
    ValidationStepAction,
    Validity,
    Value,
    ValueType,
};

// Re-export evaluator types
pub use tally_eval::{
    async_trait, CellRead, Evaluator, ExecutionContext, OpError, OpResult, Protocol,
    ProtocolFactory, ProtocolFactoryChain, ProtocolRegistry, SoftOutcome,
};
