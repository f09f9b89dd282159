//! # tally-core
//!
//! Core data model for the tally report engine.
//!
//! This crate provides the types the evaluator and recalculation engine
//! work on:
//! - [`Report`], [`Section`], [`TreeTable`] - the report tree
//! - [`Cell`] and the cell kinds ([`ConstCell`], [`InputCell`], [`OperationCell`], [`NullCell`], [`SlottedCell`])
//! - [`Op`] - operation trees, including validation and availability pipelines
//! - [`EventLog`] - append-only per-cell histories and their status projections
//! - [`CellLocator`] and [`ReportCache`] - cell addressing and the report index
//!
//! ## Example
//!
//! ```rust
//! use tally_core::{
//!     CellLocator, Column, InputCell, Op, OperationCell, Report, ReportCache, Row, Section,
//!     StandardCellLocator, TreeTable, ValueType,
//! };
//!
//! let mut report = Report::new("example");
//! let input = report.add_cell(InputCell::new(ValueType::Decimal).with_id("input"));
//! let doubled = report.add_cell(
//!     OperationCell::new(Op::sum(vec![
//!         Op::get_value(CellLocator::section("input"), ValueType::Decimal),
//!         Op::get_value(CellLocator::section("input"), ValueType::Decimal),
//!     ]))
//!     .unwrap()
//!     .with_id("doubled"),
//! );
//! report.add_section(Section::new(
//!     "main",
//!     TreeTable::new(vec![Column::new("value")])
//!         .with_data_row(Row::with_cells(vec![input]))
//!         .with_data_row(Row::with_cells(vec![doubled])),
//! ));
//!
//! let cache = ReportCache::new(report).unwrap();
//! assert_eq!(cache.get_cell(&StandardCellLocator::new("doubled")).unwrap(), doubled);
//! assert_eq!(cache.operation_cells(), &[doubled]);
//! ```

pub mod cache;
pub mod cell;
pub mod error;
pub mod event;
pub mod locator;
pub mod op;
pub mod report;
pub mod step;
pub mod table;
pub mod value;

// Re-exports for convenience
pub use cache::ReportCache;
pub use cell::{
    AvailabilityCheck, Cell, CellBase, CellCapability, CellHandle, ConstCell,
    HasAvailabilityCheck, HasOperationOutput, HasValidation, InputCell, NotSlottedCell, NullCell,
    OperationCell, SlottedCell, Validation,
};
pub use error::{CellNotFoundError, Error, NotFoundReason, Result, StructuralConflict};
pub use event::{
    Availability, AvailabilityCheckOutcome, AvailabilityCheckStatus, Concern, Event, EventLog,
    InputOutcome, OpExecutionOutcome, OpExecutionStatus, ValidationOutcome, ValidationStatus,
    Validity,
};
pub use locator::{
    CellLocator, InReportCellLocator, ReportWideLocator, SectionCellLocator,
    SlotSelectionStrategy, StandardCellLocator,
};
pub use op::{CompareOperator, CustomOp, Op};
pub use report::{Report, Section};
pub use step::{
    AvailabilityCheckChain, AvailabilityCheckStepAction, Step, StepCondition, ValidationChain,
    ValidationStepAction,
};
pub use table::{Column, Row, TreeTable};
pub use value::{Value, ValueType};

// Decimal type used by `Value::Decimal`
pub use rust_decimal::Decimal;
