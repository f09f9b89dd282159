//! Concrete not-slotted cell kinds

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::capability::{
    AvailabilityCheck, HasAvailabilityCheck, HasOperationOutput, HasValidation, Validation,
};
use crate::error::{Error, Result};
use crate::event::{Availability, Event, EventLog, InputOutcome, OpExecutionOutcome};
use crate::op::Op;
use crate::value::{Value, ValueType};

/// State shared by every cell kind that can be validated and gated
#[derive(Debug, Clone)]
pub struct CellBase {
    /// Id used by locators
    pub id: Option<String>,
    /// Number of table columns the cell covers (at least 1)
    pub column_span: usize,
    pub validation: Option<Validation>,
    pub availability_check: Option<AvailabilityCheck>,
}

impl Default for CellBase {
    fn default() -> Self {
        Self {
            id: None,
            column_span: 1,
            validation: None,
            availability_check: None,
        }
    }
}

macro_rules! cell_builders {
    ($($ty:ty),+) => {
        $(
            impl $ty {
                pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
                    self.base.id = Some(id.into());
                    self
                }

                /// Cover `span` columns; zero is treated as one
                pub fn with_column_span(mut self, span: usize) -> Self {
                    self.base.column_span = span.max(1);
                    self
                }

                /// Attach a validation op producing a `ValidationResult`
                pub fn with_validation(mut self, op: Op) -> Result<Self> {
                    self.base.validation = Some(Validation::new(op)?);
                    Ok(self)
                }

                /// Attach an availability check op producing an `AvailabilityCheckResult`
                pub fn with_availability_check(
                    mut self,
                    op: Op,
                    default_availability: Availability,
                ) -> Result<Self> {
                    self.base.availability_check =
                        Some(AvailabilityCheck::new(op, default_availability)?);
                    Ok(self)
                }

                pub fn base(&self) -> &CellBase {
                    &self.base
                }

                pub fn id(&self) -> Option<&str> {
                    self.base.id.as_deref()
                }
            }

            impl HasValidation for $ty {
                fn validation(&self) -> Option<&Validation> {
                    self.base.validation.as_ref()
                }

                fn validation_mut(&mut self) -> Option<&mut Validation> {
                    self.base.validation.as_mut()
                }
            }

            impl HasAvailabilityCheck for $ty {
                fn availability_check(&self) -> Option<&AvailabilityCheck> {
                    self.base.availability_check.as_ref()
                }

                fn availability_check_mut(&mut self) -> Option<&mut AvailabilityCheck> {
                    self.base.availability_check.as_mut()
                }
            }
        )+
    };
}

/// A cell with a fixed value
#[derive(Debug, Clone)]
pub struct ConstCell {
    base: CellBase,
    value: Value,
}

impl ConstCell {
    pub fn new<V: Into<Value>>(value: V) -> Self {
        Self {
            base: CellBase::default(),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A cell whose value is set from outside
#[derive(Debug, Clone)]
pub struct InputCell {
    base: CellBase,
    value_type: ValueType,
    events: EventLog<InputOutcome>,
}

impl InputCell {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            base: CellBase::default(),
            value_type,
            events: EventLog::new(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The current value, if one was applied and not cleared since
    pub fn value(&self) -> Option<&Value> {
        self.events.current_value()
    }

    pub fn events(&self) -> &EventLog<InputOutcome> {
        &self.events
    }

    /// Apply a new value
    ///
    /// Integers are accepted by decimal inputs; any other type mismatch is
    /// rejected.
    pub fn set_value(&mut self, timestamp: DateTime<Utc>, value: Value) -> Result<()> {
        let value = match (self.value_type, value) {
            (ValueType::Decimal, Value::Integer(i)) => Value::Decimal(Decimal::from(i)),
            (_, value) => value,
        };
        if value.value_type() != self.value_type {
            return Err(Error::TypeMismatch {
                expected: self.value_type,
                actual: value.value_type(),
            });
        }
        self.events
            .append(Event::new(timestamp, InputOutcome::Applied(value)));
        Ok(())
    }

    pub fn clear_value(&mut self, timestamp: DateTime<Utc>, details: Option<&str>) {
        let event = Event::new(timestamp, InputOutcome::Cleared);
        self.events.append(match details {
            Some(details) => event.with_details(details),
            None => event,
        });
    }
}

/// A cell whose value is computed by an op
#[derive(Debug, Clone)]
pub struct OperationCell {
    base: CellBase,
    op: Op,
    events: EventLog<OpExecutionOutcome>,
}

impl OperationCell {
    /// Create an operation cell; the op tree must type check
    pub fn new(op: Op) -> Result<Self> {
        op.type_check()?;
        Ok(Self {
            base: CellBase::default(),
            op,
            events: EventLog::new(),
        })
    }

    pub fn return_type(&self) -> ValueType {
        self.op.return_type()
    }
}

impl HasOperationOutput for OperationCell {
    fn operation(&self) -> &Op {
        &self.op
    }

    fn op_events(&self) -> &EventLog<OpExecutionOutcome> {
        &self.events
    }

    fn record_op_execution(&mut self, event: Event<OpExecutionOutcome>) {
        self.events.append(event);
    }
}

/// A layout placeholder that never holds a value
#[derive(Debug, Clone)]
pub struct NullCell {
    base: CellBase,
}

impl NullCell {
    pub fn new() -> Self {
        Self {
            base: CellBase::default(),
        }
    }
}

impl Default for NullCell {
    fn default() -> Self {
        Self::new()
    }
}

cell_builders!(ConstCell, InputCell, OperationCell, NullCell);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AvailabilityCheckOutcome, ValidationOutcome, ValidationStatus};
    use crate::step::{AvailabilityCheckChain, ValidationChain};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_input_type_checked() {
        let mut cell = InputCell::new(ValueType::Decimal);
        assert!(cell.set_value(ts(), Value::Boolean(true)).is_err());
        assert!(cell.value().is_none());

        cell.set_value(ts(), Value::Integer(4)).unwrap();
        assert_eq!(cell.value(), Some(&Value::Decimal(Decimal::from(4))));

        cell.clear_value(ts(), Some("reset"));
        assert!(cell.value().is_none());
        assert_eq!(cell.events().len(), 2);
    }

    #[test]
    fn test_events_require_specification() {
        let mut cell = ConstCell::new(1i64);
        let event = Event::new(ts(), ValidationOutcome::DeterminedValid(None));
        assert!(matches!(
            cell.record_validation(event),
            Err(Error::InvalidOperation(_))
        ));
        assert!(cell.clear_availability_check(ts(), None).is_err());
        assert_eq!(cell.validation_status(), ValidationStatus::Unvalidated);
    }

    #[test]
    fn test_validation_op_must_produce_validation_result() {
        assert!(InputCell::new(ValueType::Boolean)
            .with_validation(Op::constant(true))
            .is_err());
        assert!(InputCell::new(ValueType::Boolean)
            .with_validation(Op::Validate(ValidationChain::new()))
            .is_ok());
    }

    #[test]
    fn test_committed_availability() {
        let mut cell = InputCell::new(ValueType::Decimal)
            .with_availability_check(
                Op::CheckAvailability(AvailabilityCheckChain::new()),
                Availability::Disabled,
            )
            .unwrap();
        assert_eq!(cell.availability(), Availability::Disabled);

        cell.record_availability_check(Event::new(
            ts(),
            AvailabilityCheckOutcome::DeterminedEnabled(Some("ok".into())),
        ))
        .unwrap();
        assert_eq!(cell.availability(), Availability::Enabled);

        // an undetermined last event falls back to the default
        cell.record_availability_check(Event::new(ts(), AvailabilityCheckOutcome::Aborted(None)))
            .unwrap();
        assert_eq!(cell.availability(), Availability::Disabled);
        assert_eq!(cell.availability_message(), None);
    }

    #[test]
    fn test_cleared_check_restores_default_availability() {
        let mut cell = InputCell::new(ValueType::Decimal)
            .with_availability_check(
                Op::CheckAvailability(AvailabilityCheckChain::new()),
                Availability::Enabled,
            )
            .unwrap();
        cell.record_availability_check(Event::new(
            ts(),
            AvailabilityCheckOutcome::DeterminedDisabled(None),
        ))
        .unwrap();
        assert_eq!(cell.availability(), Availability::Disabled);

        cell.clear_availability_check(ts(), Some("reopened")).unwrap();
        assert_eq!(cell.availability(), Availability::Enabled);
    }

    #[test]
    fn test_cells_without_check_are_enabled() {
        assert_eq!(NullCell::new().availability(), Availability::Enabled);
    }
}
