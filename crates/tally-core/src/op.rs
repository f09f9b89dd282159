//! Operation trees
//!
//! An [`Op`] is one node of an immutable expression tree. Built-in node
//! kinds are variants of the enum; anything else is carried by
//! [`Op::Custom`] and executed by a protocol registered for its kind.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::locator::CellLocator;
use crate::step::{AvailabilityCheckChain, StepCondition, ValidationChain};
use crate::value::{Value, ValueType};

/// Comparison operators for [`Op::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOperator {
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterThanOrEqualTo => ">=",
            CompareOperator::LessThan => "<",
            CompareOperator::LessThanOrEqualTo => "<=",
        }
    }
}

/// A user-defined op kind
///
/// The payload is opaque to the interpreter; a protocol registered for
/// `(kind(), return_type())` receives it and downcasts it back.
pub trait CustomOp: fmt::Debug + Send + Sync + 'static {
    /// Name the protocol registry keys on
    fn kind(&self) -> &'static str;

    fn return_type(&self) -> ValueType;

    fn as_any(&self) -> &dyn Any;
}

impl dyn CustomOp {
    pub fn downcast_ref<T: CustomOp>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A node of an operation tree
#[derive(Debug, Clone)]
pub enum Op {
    Const(Value),
    IfThenElse {
        condition: Box<Op>,
        then: Box<Op>,
        otherwise: Box<Op>,
    },
    IsEqualTo {
        left: Box<Op>,
        right: Box<Op>,
    },
    /// Short-circuiting conjunction, evaluated left to right
    AndAlso(Vec<Op>),
    /// Short-circuiting disjunction, evaluated left to right
    OrElse(Vec<Op>),
    Not(Box<Op>),
    Sum(Vec<Op>),
    Compare {
        left: Box<Op>,
        operator: CompareOperator,
        right: Box<Op>,
    },
    Divide {
        numerator: Box<Op>,
        denominator: Box<Op>,
    },
    GetNumberOfSignificantDigits(Box<Op>),
    HasValue(CellLocator),
    GetValue {
        locator: CellLocator,
        value_type: ValueType,
    },
    GetOpExecutionStatus(CellLocator),
    GetValidationStatus(CellLocator),
    GetAvailability(CellLocator),
    /// Always aborts the computation it is part of
    Abort {
        value_type: ValueType,
        message: Option<Box<Op>>,
    },
    /// Always marks the computation it is part of as not applicable
    NotApplicable {
        value_type: ValueType,
        message: Option<Box<Op>>,
    },
    Validate(ValidationChain),
    CheckAvailability(AvailabilityCheckChain),
    Custom(Arc<dyn CustomOp>),
}

impl Op {
    pub fn constant<V: Into<Value>>(value: V) -> Self {
        Op::Const(value.into())
    }

    pub fn if_then_else(condition: Op, then: Op, otherwise: Op) -> Self {
        Op::IfThenElse {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn is_equal_to(left: Op, right: Op) -> Self {
        Op::IsEqualTo {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and_also(ops: Vec<Op>) -> Self {
        Op::AndAlso(ops)
    }

    pub fn or_else(ops: Vec<Op>) -> Self {
        Op::OrElse(ops)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(op: Op) -> Self {
        Op::Not(Box::new(op))
    }

    pub fn sum(ops: Vec<Op>) -> Self {
        Op::Sum(ops)
    }

    pub fn compare(left: Op, operator: CompareOperator, right: Op) -> Self {
        Op::Compare {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn divide(numerator: Op, denominator: Op) -> Self {
        Op::Divide {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn significant_digits(op: Op) -> Self {
        Op::GetNumberOfSignificantDigits(Box::new(op))
    }

    pub fn has_value(locator: CellLocator) -> Self {
        Op::HasValue(locator)
    }

    pub fn get_value(locator: CellLocator, value_type: ValueType) -> Self {
        Op::GetValue {
            locator,
            value_type,
        }
    }

    pub fn abort(value_type: ValueType) -> Self {
        Op::Abort {
            value_type,
            message: None,
        }
    }

    pub fn abort_with(value_type: ValueType, message: &str) -> Self {
        Op::Abort {
            value_type,
            message: Some(Box::new(Op::Const(Value::text(message)))),
        }
    }

    pub fn not_applicable(value_type: ValueType) -> Self {
        Op::NotApplicable {
            value_type,
            message: None,
        }
    }

    pub fn not_applicable_with(value_type: ValueType, message: &str) -> Self {
        Op::NotApplicable {
            value_type,
            message: Some(Box::new(Op::Const(Value::text(message)))),
        }
    }

    pub fn custom<T: CustomOp>(op: T) -> Self {
        Op::Custom(Arc::new(op))
    }

    /// Short name of the node kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Op::Const(_) => "Const",
            Op::IfThenElse { .. } => "IfThenElse",
            Op::IsEqualTo { .. } => "IsEqualTo",
            Op::AndAlso(_) => "AndAlso",
            Op::OrElse(_) => "OrElse",
            Op::Not(_) => "Not",
            Op::Sum(_) => "Sum",
            Op::Compare { .. } => "Compare",
            Op::Divide { .. } => "Divide",
            Op::GetNumberOfSignificantDigits(_) => "GetNumberOfSignificantDigits",
            Op::HasValue(_) => "HasValue",
            Op::GetValue { .. } => "GetValue",
            Op::GetOpExecutionStatus(_) => "GetOpExecutionStatus",
            Op::GetValidationStatus(_) => "GetValidationStatus",
            Op::GetAvailability(_) => "GetAvailability",
            Op::Abort { .. } => "Abort",
            Op::NotApplicable { .. } => "NotApplicable",
            Op::Validate(_) => "Validate",
            Op::CheckAvailability(_) => "CheckAvailability",
            Op::Custom(op) => op.kind(),
        }
    }

    /// The declared type of the value this op produces
    pub fn return_type(&self) -> ValueType {
        match self {
            Op::Const(value) => value.value_type(),
            Op::IfThenElse { then, .. } => then.return_type(),
            Op::IsEqualTo { .. }
            | Op::AndAlso(_)
            | Op::OrElse(_)
            | Op::Not(_)
            | Op::Compare { .. }
            | Op::HasValue(_) => ValueType::Boolean,
            Op::Sum(ops) => {
                if !ops.is_empty() && ops.iter().all(|op| op.return_type() == ValueType::Integer) {
                    ValueType::Integer
                } else {
                    ValueType::Decimal
                }
            }
            Op::Divide { .. } => ValueType::Decimal,
            Op::GetNumberOfSignificantDigits(_) => ValueType::Integer,
            Op::GetValue { value_type, .. } => *value_type,
            Op::GetOpExecutionStatus(_) => ValueType::OpExecutionStatus,
            Op::GetValidationStatus(_) => ValueType::ValidationStatus,
            Op::GetAvailability(_) => ValueType::Availability,
            Op::Abort { value_type, .. } | Op::NotApplicable { value_type, .. } => *value_type,
            Op::Validate(_) => ValueType::ValidationResult,
            Op::CheckAvailability(_) => ValueType::AvailabilityCheckResult,
            Op::Custom(op) => op.return_type(),
        }
    }

    /// Check that every child op produces the type its parent needs
    pub fn type_check(&self) -> Result<()> {
        match self {
            Op::Const(_)
            | Op::HasValue(_)
            | Op::GetValue { .. }
            | Op::GetOpExecutionStatus(_)
            | Op::GetValidationStatus(_)
            | Op::GetAvailability(_)
            | Op::Custom(_) => Ok(()),
            Op::IfThenElse {
                condition,
                then,
                otherwise,
            } => {
                expect_type(condition, ValueType::Boolean)?;
                then.type_check()?;
                expect_type(otherwise, then.return_type())
            }
            Op::IsEqualTo { left, right } => {
                left.type_check()?;
                right.type_check()?;
                let (l, r) = (left.return_type(), right.return_type());
                if l == r || (l.is_numeric() && r.is_numeric()) {
                    Ok(())
                } else {
                    Err(Error::TypeMismatch {
                        expected: l,
                        actual: r,
                    })
                }
            }
            Op::AndAlso(ops) | Op::OrElse(ops) => ops
                .iter()
                .try_for_each(|op| expect_type(op, ValueType::Boolean)),
            Op::Not(op) => expect_type(op, ValueType::Boolean),
            Op::Sum(ops) => ops.iter().try_for_each(expect_numeric),
            Op::Compare { left, right, .. } => {
                expect_numeric(left)?;
                expect_numeric(right)
            }
            Op::Divide {
                numerator,
                denominator,
            } => {
                expect_numeric(numerator)?;
                expect_numeric(denominator)
            }
            Op::GetNumberOfSignificantDigits(op) => expect_numeric(op),
            Op::Abort { message, .. } | Op::NotApplicable { message, .. } => match message {
                Some(message) => expect_type(message, ValueType::Text),
                None => Ok(()),
            },
            Op::Validate(chain) => chain
                .steps
                .iter()
                .try_for_each(|step| check_step_condition(&step.condition)),
            Op::CheckAvailability(chain) => chain
                .steps
                .iter()
                .try_for_each(|step| check_step_condition(&step.condition)),
        }
    }
}

fn expect_type(op: &Op, expected: ValueType) -> Result<()> {
    op.type_check()?;
    let actual = op.return_type();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::TypeMismatch { expected, actual })
    }
}

fn expect_numeric(op: &Op) -> Result<()> {
    op.type_check()?;
    let actual = op.return_type();
    if actual.is_numeric() {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: ValueType::Decimal,
            actual,
        })
    }
}

fn check_step_condition(condition: &StepCondition) -> Result<()> {
    match condition {
        StepCondition::Literal { condition, .. } => expect_type(condition, ValueType::Boolean),
        StepCondition::OpMessage { condition, message } => {
            expect_type(condition, ValueType::Boolean)?;
            expect_type(message, ValueType::Text)
        }
        StepCondition::Composite(op) => expect_type(op, ValueType::BooleanWithMessage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{Step, ValidationStepAction};
    use rust_decimal::Decimal;

    #[derive(Debug)]
    struct Lookup;

    impl CustomOp for Lookup {
        fn kind(&self) -> &'static str {
            "lookup"
        }

        fn return_type(&self) -> ValueType {
            ValueType::Text
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_return_types() {
        let decimal = Op::get_value(CellLocator::section("a"), ValueType::Decimal);
        assert_eq!(
            Op::sum(vec![Op::constant(1i64), Op::constant(2i64)]).return_type(),
            ValueType::Integer
        );
        assert_eq!(
            Op::sum(vec![Op::constant(1i64), decimal.clone()]).return_type(),
            ValueType::Decimal
        );
        assert_eq!(
            Op::divide(decimal, Op::constant(2i64)).return_type(),
            ValueType::Decimal
        );
        assert_eq!(
            Op::Validate(ValidationChain::new()).return_type(),
            ValueType::ValidationResult
        );
        assert_eq!(Op::custom(Lookup).return_type(), ValueType::Text);
    }

    #[test]
    fn test_type_check_rejects_mismatched_branches() {
        let op = Op::if_then_else(
            Op::constant(true),
            Op::constant(Decimal::ONE),
            Op::constant("text"),
        );
        assert!(matches!(
            op.type_check(),
            Err(Error::TypeMismatch {
                expected: ValueType::Decimal,
                actual: ValueType::Text
            })
        ));

        let op = Op::if_then_else(
            Op::constant(true),
            Op::constant(Decimal::ONE),
            Op::not_applicable(ValueType::Decimal),
        );
        assert!(op.type_check().is_ok());
    }

    #[test]
    fn test_type_check_rejects_non_boolean_logic() {
        let op = Op::and_also(vec![Op::constant(true), Op::constant(1i64)]);
        assert!(op.type_check().is_err());

        let op = Op::sum(vec![Op::constant(true)]);
        assert!(op.type_check().is_err());
    }

    #[test]
    fn test_type_check_walks_steps() {
        let chain = ValidationChain::new().step(Step::literal(
            Op::constant(Decimal::ONE),
            "not a boolean",
            ValidationStepAction::NextStep,
            ValidationStepAction::StopAsInvalid,
        ));
        assert!(Op::Validate(chain).type_check().is_err());
    }

    #[test]
    fn test_custom_downcast() {
        let op = Op::custom(Lookup);
        match op {
            Op::Custom(custom) => {
                assert_eq!(custom.kind(), "lookup");
                assert!(custom.downcast_ref::<Lookup>().is_some());
            }
            _ => unreachable!(),
        }
    }
}
