//! Values produced by cells and operations

use std::fmt;

use rust_decimal::Decimal;

use crate::event::{Availability, OpExecutionStatus, ValidationStatus, Validity};

/// The declared type of a [`Value`]
///
/// Every op declares the type it returns; protocols are registered per
/// (op kind, return type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Boolean,
    Decimal,
    Integer,
    Text,
    /// A boolean bundled with an optional message
    BooleanWithMessage,
    OpExecutionStatus,
    ValidationStatus,
    Availability,
    /// Outcome of a `Validate` op
    ValidationResult,
    /// Outcome of a `CheckAvailability` op
    AvailabilityCheckResult,
}

impl ValueType {
    /// Check if values of this type take part in arithmetic
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Decimal | ValueType::Integer)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "Boolean",
            ValueType::Decimal => "Decimal",
            ValueType::Integer => "Integer",
            ValueType::Text => "Text",
            ValueType::BooleanWithMessage => "BooleanWithMessage",
            ValueType::OpExecutionStatus => "OpExecutionStatus",
            ValueType::ValidationStatus => "ValidationStatus",
            ValueType::Availability => "Availability",
            ValueType::ValidationResult => "ValidationResult",
            ValueType::AvailabilityCheckResult => "AvailabilityCheckResult",
        };
        f.write_str(name)
    }
}

/// A value held by a cell or produced by an op
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Boolean(bool),
    Decimal(Decimal),
    Integer(i64),
    Text(String),
    BooleanWithMessage {
        value: bool,
        message: Option<String>,
    },
    OpExecutionStatus(OpExecutionStatus),
    ValidationStatus(ValidationStatus),
    Availability(Availability),
    ValidationResult {
        validity: Validity,
        message: Option<String>,
    },
    AvailabilityCheckResult {
        availability: Availability,
        message: Option<String>,
    },
}

impl Value {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Create a boolean bundled with a message
    pub fn boolean_with_message(value: bool, message: Option<&str>) -> Self {
        Value::BooleanWithMessage {
            value,
            message: message.map(str::to_string),
        }
    }

    /// The runtime type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Integer(_) => ValueType::Integer,
            Value::Text(_) => ValueType::Text,
            Value::BooleanWithMessage { .. } => ValueType::BooleanWithMessage,
            Value::OpExecutionStatus(_) => ValueType::OpExecutionStatus,
            Value::ValidationStatus(_) => ValueType::ValidationStatus,
            Value::Availability(_) => ValueType::Availability,
            Value::ValidationResult { .. } => ValueType::ValidationResult,
            Value::AvailabilityCheckResult { .. } => ValueType::AvailabilityCheckResult,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a decimal, widening integers
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<OpExecutionStatus> for Value {
    fn from(value: OpExecutionStatus) -> Self {
        Value::OpExecutionStatus(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => f.write_str(s),
            Value::BooleanWithMessage { value, message } => match message {
                Some(message) => write!(f, "{value} ({message})"),
                None => write!(f, "{value}"),
            },
            Value::OpExecutionStatus(s) => write!(f, "{s}"),
            Value::ValidationStatus(s) => write!(f, "{s}"),
            Value::Availability(a) => write!(f, "{a}"),
            Value::ValidationResult { validity, message } => match message {
                Some(message) => write!(f, "{validity}: {message}"),
                None => write!(f, "{validity}"),
            },
            Value::AvailabilityCheckResult {
                availability,
                message,
            } => match message {
                Some(message) => write!(f, "{availability}: {message}"),
                None => write!(f, "{availability}"),
            },
        }
    }
}
