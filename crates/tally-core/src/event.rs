//! Append-only event logs and the statuses projected from them
//!
//! Each cell keeps one log per concern (input, operation execution,
//! validation, availability check). Logs are only ever appended to; the
//! current status of a concern is a pure function of the log's last entry.

use std::fmt;
use std::slice;

use chrono::{DateTime, Utc};

use crate::value::Value;

/// A timestamped entry in an [`EventLog`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event<T> {
    /// When the event was recorded
    pub timestamp_utc: DateTime<Utc>,
    /// Free-form details supplied by whoever recorded the event
    pub details: Option<String>,
    /// What happened
    pub outcome: T,
}

impl<T> Event<T> {
    pub fn new(timestamp_utc: DateTime<Utc>, outcome: T) -> Self {
        Self {
            timestamp_utc,
            details: None,
            outcome,
        }
    }

    pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// An append-only, ordered history of events
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLog<T> {
    events: Vec<Event<T>>,
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> EventLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that already holds `events`, oldest first
    pub fn from_events(events: Vec<Event<T>>) -> Self {
        Self { events }
    }

    pub fn append(&mut self, event: Event<T>) {
        self.events.push(event);
    }

    /// The most recent event
    pub fn last(&self) -> Option<&Event<T>> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Event<T>> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event<T>] {
        &self.events
    }
}

impl<'a, T> IntoIterator for &'a EventLog<T> {
    type Item = &'a Event<T>;
    type IntoIter = slice::Iter<'a, Event<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// The concerns a recalculation pass derives for each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Concern {
    AvailabilityCheck,
    Validation,
    OpExecution,
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Concern::AvailabilityCheck => "availability check",
            Concern::Validation => "validation",
            Concern::OpExecution => "operation",
        })
    }
}

// === Event payloads ===

/// Entries of an input cell's log
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputOutcome {
    Applied(Value),
    Cleared,
}

/// Entries of an operation cell's execution log
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpExecutionOutcome {
    Cleared,
    Completed(Value),
    Aborted(Option<String>),
    DeemedNotApplicable(Option<String>),
    Failed(String),
}

/// Entries of a cell's validation log
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationOutcome {
    Cleared,
    DeterminedValid(Option<String>),
    DeterminedInvalid(Option<String>),
    Aborted(Option<String>),
    DeemedNotApplicable(Option<String>),
    Failed(String),
}

/// Entries of a cell's availability check log
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AvailabilityCheckOutcome {
    Cleared,
    DeterminedEnabled(Option<String>),
    DeterminedDisabled(Option<String>),
    Aborted(Option<String>),
    DeemedNotApplicable(Option<String>),
    Failed(String),
}

// === Status projections ===

/// Status of an operation cell, projected from its last execution event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpExecutionStatus {
    /// No execution event has been recorded
    NotExecuted,
    Cleared,
    Completed,
    Aborted,
    DeemedNotApplicable,
    Failed,
}

/// Status of a cell's validation, projected from its last validation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationStatus {
    /// No validation event has been recorded
    Unvalidated,
    Cleared,
    Valid,
    Invalid,
    Aborted,
    DeemedNotApplicable,
    Failed,
}

/// Status of a cell's availability check, projected from its last event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AvailabilityCheckStatus {
    /// No availability check event has been recorded
    Unchecked,
    Cleared,
    Enabled,
    Disabled,
    Aborted,
    DeemedNotApplicable,
    Failed,
}

/// Result of a successful validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Validity {
    Valid,
    Invalid,
}

/// Whether a cell can be interacted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Availability {
    #[default]
    Enabled,
    Disabled,
}

impl OpExecutionOutcome {
    pub fn status(&self) -> OpExecutionStatus {
        match self {
            OpExecutionOutcome::Cleared => OpExecutionStatus::Cleared,
            OpExecutionOutcome::Completed(_) => OpExecutionStatus::Completed,
            OpExecutionOutcome::Aborted(_) => OpExecutionStatus::Aborted,
            OpExecutionOutcome::DeemedNotApplicable(_) => OpExecutionStatus::DeemedNotApplicable,
            OpExecutionOutcome::Failed(_) => OpExecutionStatus::Failed,
        }
    }

    /// The computed value, if the operation completed
    pub fn value(&self) -> Option<&Value> {
        match self {
            OpExecutionOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

impl ValidationOutcome {
    pub fn status(&self) -> ValidationStatus {
        match self {
            ValidationOutcome::Cleared => ValidationStatus::Cleared,
            ValidationOutcome::DeterminedValid(_) => ValidationStatus::Valid,
            ValidationOutcome::DeterminedInvalid(_) => ValidationStatus::Invalid,
            ValidationOutcome::Aborted(_) => ValidationStatus::Aborted,
            ValidationOutcome::DeemedNotApplicable(_) => ValidationStatus::DeemedNotApplicable,
            ValidationOutcome::Failed(_) => ValidationStatus::Failed,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::DeterminedValid(m)
            | ValidationOutcome::DeterminedInvalid(m)
            | ValidationOutcome::Aborted(m)
            | ValidationOutcome::DeemedNotApplicable(m) => m.as_deref(),
            ValidationOutcome::Failed(details) => Some(details),
            ValidationOutcome::Cleared => None,
        }
    }
}

impl AvailabilityCheckOutcome {
    pub fn status(&self) -> AvailabilityCheckStatus {
        match self {
            AvailabilityCheckOutcome::Cleared => AvailabilityCheckStatus::Cleared,
            AvailabilityCheckOutcome::DeterminedEnabled(_) => AvailabilityCheckStatus::Enabled,
            AvailabilityCheckOutcome::DeterminedDisabled(_) => AvailabilityCheckStatus::Disabled,
            AvailabilityCheckOutcome::Aborted(_) => AvailabilityCheckStatus::Aborted,
            AvailabilityCheckOutcome::DeemedNotApplicable(_) => {
                AvailabilityCheckStatus::DeemedNotApplicable
            }
            AvailabilityCheckOutcome::Failed(_) => AvailabilityCheckStatus::Failed,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AvailabilityCheckOutcome::DeterminedEnabled(m)
            | AvailabilityCheckOutcome::DeterminedDisabled(m)
            | AvailabilityCheckOutcome::Aborted(m)
            | AvailabilityCheckOutcome::DeemedNotApplicable(m) => m.as_deref(),
            AvailabilityCheckOutcome::Failed(details) => Some(details),
            AvailabilityCheckOutcome::Cleared => None,
        }
    }

    /// The availability this outcome determined, if it determined one
    pub fn availability(&self) -> Option<Availability> {
        match self {
            AvailabilityCheckOutcome::DeterminedEnabled(_) => Some(Availability::Enabled),
            AvailabilityCheckOutcome::DeterminedDisabled(_) => Some(Availability::Disabled),
            _ => None,
        }
    }
}

impl EventLog<OpExecutionOutcome> {
    pub fn status(&self) -> OpExecutionStatus {
        self.last()
            .map(|e| e.outcome.status())
            .unwrap_or(OpExecutionStatus::NotExecuted)
    }
}

impl EventLog<ValidationOutcome> {
    pub fn status(&self) -> ValidationStatus {
        self.last()
            .map(|e| e.outcome.status())
            .unwrap_or(ValidationStatus::Unvalidated)
    }
}

impl EventLog<AvailabilityCheckOutcome> {
    pub fn status(&self) -> AvailabilityCheckStatus {
        self.last()
            .map(|e| e.outcome.status())
            .unwrap_or(AvailabilityCheckStatus::Unchecked)
    }
}

impl EventLog<InputOutcome> {
    /// The value applied by the last event, if it was not cleared since
    pub fn current_value(&self) -> Option<&Value> {
        match self.last().map(|e| &e.outcome) {
            Some(InputOutcome::Applied(value)) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for OpExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpExecutionStatus::NotExecuted => "NotExecuted",
            OpExecutionStatus::Cleared => "Cleared",
            OpExecutionStatus::Completed => "Completed",
            OpExecutionStatus::Aborted => "Aborted",
            OpExecutionStatus::DeemedNotApplicable => "DeemedNotApplicable",
            OpExecutionStatus::Failed => "Failed",
        })
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Unvalidated => "Unvalidated",
            ValidationStatus::Cleared => "Cleared",
            ValidationStatus::Valid => "Valid",
            ValidationStatus::Invalid => "Invalid",
            ValidationStatus::Aborted => "Aborted",
            ValidationStatus::DeemedNotApplicable => "DeemedNotApplicable",
            ValidationStatus::Failed => "Failed",
        })
    }
}

impl fmt::Display for AvailabilityCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AvailabilityCheckStatus::Unchecked => "Unchecked",
            AvailabilityCheckStatus::Cleared => "Cleared",
            AvailabilityCheckStatus::Enabled => "Enabled",
            AvailabilityCheckStatus::Disabled => "Disabled",
            AvailabilityCheckStatus::Aborted => "Aborted",
            AvailabilityCheckStatus::DeemedNotApplicable => "DeemedNotApplicable",
            AvailabilityCheckStatus::Failed => "Failed",
        })
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
        })
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Availability::Enabled => "Enabled",
            Availability::Disabled => "Disabled",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap()
    }

    #[test]
    fn test_empty_log_projects_sentinel() {
        let log: EventLog<OpExecutionOutcome> = EventLog::new();
        assert_eq!(log.status(), OpExecutionStatus::NotExecuted);

        let log: EventLog<ValidationOutcome> = EventLog::new();
        assert_eq!(log.status(), ValidationStatus::Unvalidated);

        let log: EventLog<AvailabilityCheckOutcome> = EventLog::new();
        assert_eq!(log.status(), AvailabilityCheckStatus::Unchecked);
    }

    #[test]
    fn test_status_follows_last_event() {
        let mut log = EventLog::new();
        log.append(Event::new(at(0), OpExecutionOutcome::Completed(Value::Integer(1))));
        log.append(Event::new(at(1), OpExecutionOutcome::Aborted(None)));
        assert_eq!(log.status(), OpExecutionStatus::Aborted);
        assert_eq!(log.len(), 2);

        log.append(Event::new(at(2), OpExecutionOutcome::Cleared).with_details("reset"));
        assert_eq!(log.status(), OpExecutionStatus::Cleared);
        assert_eq!(log.last().unwrap().details.as_deref(), Some("reset"));
    }

    #[test]
    fn test_input_cleared_hides_value() {
        let mut log = EventLog::new();
        log.append(Event::new(at(0), InputOutcome::Applied(Value::Boolean(true))));
        assert_eq!(log.current_value(), Some(&Value::Boolean(true)));

        log.append(Event::new(at(1), InputOutcome::Cleared));
        assert_eq!(log.current_value(), None);
    }
}
