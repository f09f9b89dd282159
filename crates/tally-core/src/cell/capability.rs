//! Capabilities a cell may carry in addition to its kind

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::event::{
    Availability, AvailabilityCheckOutcome, AvailabilityCheckStatus, Event, EventLog,
    OpExecutionOutcome, OpExecutionStatus, ValidationOutcome, ValidationStatus,
};
use crate::op::Op;
use crate::value::{Value, ValueType};

/// A cell's validation: the op that derives validity, and its history
#[derive(Debug, Clone)]
pub struct Validation {
    op: Op,
    events: EventLog<ValidationOutcome>,
}

impl Validation {
    /// Create a validation; `op` must produce a `ValidationResult`
    pub fn new(op: Op) -> Result<Self> {
        check_root(&op, ValueType::ValidationResult)?;
        Ok(Self {
            op,
            events: EventLog::new(),
        })
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn events(&self) -> &EventLog<ValidationOutcome> {
        &self.events
    }
}

/// A cell's availability check and the availability used until it runs
#[derive(Debug, Clone)]
pub struct AvailabilityCheck {
    op: Op,
    default_availability: Availability,
    events: EventLog<AvailabilityCheckOutcome>,
}

impl AvailabilityCheck {
    /// Create an availability check; `op` must produce an `AvailabilityCheckResult`
    pub fn new(op: Op, default_availability: Availability) -> Result<Self> {
        check_root(&op, ValueType::AvailabilityCheckResult)?;
        Ok(Self {
            op,
            default_availability,
            events: EventLog::new(),
        })
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn default_availability(&self) -> Availability {
        self.default_availability
    }

    pub fn events(&self) -> &EventLog<AvailabilityCheckOutcome> {
        &self.events
    }
}

pub(crate) fn check_root(op: &Op, expected: ValueType) -> Result<()> {
    op.type_check()?;
    let actual = op.return_type();
    if actual != expected {
        return Err(Error::TypeMismatch { expected, actual });
    }
    Ok(())
}

/// Cells that may carry a [`Validation`]
pub trait HasValidation {
    fn validation(&self) -> Option<&Validation>;

    fn validation_mut(&mut self) -> Option<&mut Validation>;

    /// Status projected from the last validation event
    fn validation_status(&self) -> ValidationStatus {
        self.validation()
            .map(|v| v.events.status())
            .unwrap_or(ValidationStatus::Unvalidated)
    }

    fn validation_message(&self) -> Option<&str> {
        self.validation()
            .and_then(|v| v.events.last())
            .and_then(|e| e.outcome.message())
    }

    /// Append a validation event
    ///
    /// Fails if the cell has no validation.
    fn record_validation(&mut self, event: Event<ValidationOutcome>) -> Result<()> {
        match self.validation_mut() {
            Some(validation) => {
                validation.events.append(event);
                Ok(())
            }
            None => Err(Error::invalid_operation("the cell has no validation")),
        }
    }

    fn clear_validation(&mut self, timestamp: DateTime<Utc>, details: Option<&str>) -> Result<()> {
        self.record_validation(cleared(timestamp, details, ValidationOutcome::Cleared))
    }
}

/// Cells that may carry an [`AvailabilityCheck`]
pub trait HasAvailabilityCheck {
    fn availability_check(&self) -> Option<&AvailabilityCheck>;

    fn availability_check_mut(&mut self) -> Option<&mut AvailabilityCheck>;

    fn availability_check_status(&self) -> AvailabilityCheckStatus {
        self.availability_check()
            .map(|c| c.events.status())
            .unwrap_or(AvailabilityCheckStatus::Unchecked)
    }

    fn availability_message(&self) -> Option<&str> {
        self.availability_check()
            .and_then(|c| c.events.last())
            .and_then(|e| e.outcome.message())
    }

    /// The committed availability
    ///
    /// The availability determined by the last check event, or the default
    /// when that event determined none (never run, cleared, aborted, not
    /// applicable or failed). Cells without an availability check are
    /// always enabled.
    fn availability(&self) -> Availability {
        match self.availability_check() {
            Some(check) => check
                .events
                .last()
                .and_then(|e| e.outcome.availability())
                .unwrap_or(check.default_availability),
            None => Availability::Enabled,
        }
    }

    /// Append an availability check event
    ///
    /// Fails if the cell has no availability check.
    fn record_availability_check(&mut self, event: Event<AvailabilityCheckOutcome>) -> Result<()> {
        match self.availability_check_mut() {
            Some(check) => {
                check.events.append(event);
                Ok(())
            }
            None => Err(Error::invalid_operation("the cell has no availability check")),
        }
    }

    fn clear_availability_check(
        &mut self,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        self.record_availability_check(cleared(
            timestamp,
            details,
            AvailabilityCheckOutcome::Cleared,
        ))
    }
}

/// Cells whose value is computed by an op
pub trait HasOperationOutput {
    fn operation(&self) -> &Op;

    fn op_events(&self) -> &EventLog<OpExecutionOutcome>;

    fn record_op_execution(&mut self, event: Event<OpExecutionOutcome>);

    fn op_execution_status(&self) -> OpExecutionStatus {
        self.op_events().status()
    }

    /// The value of the last execution, if it completed
    fn op_value(&self) -> Option<&Value> {
        self.op_events().last().and_then(|e| e.outcome.value())
    }

    fn clear_op_execution(&mut self, timestamp: DateTime<Utc>, details: Option<&str>) {
        self.record_op_execution(cleared(timestamp, details, OpExecutionOutcome::Cleared));
    }
}

fn cleared<T>(timestamp: DateTime<Utc>, details: Option<&str>, outcome: T) -> Event<T> {
    let event = Event::new(timestamp, outcome);
    match details {
        Some(details) => event.with_details(details),
        None => event,
    }
}
