//! Step pipelines for validations and availability checks
//!
//! A pipeline is an ordered list of steps. Each step evaluates a boolean
//! condition and looks up what to do next in a two-entry action table.
//! The first terminal action stops the pipeline; if every step says
//! "next", the pipeline ends with its configured end result.

use crate::event::{Availability, Validity};
use crate::op::Op;

/// How a step obtains its condition and message
#[derive(Debug, Clone)]
pub enum StepCondition {
    /// Boolean op with a fixed message
    Literal {
        condition: Op,
        message: Option<String>,
    },
    /// Boolean op with a text op for the message
    ///
    /// The message op only runs when the step stops the pipeline.
    OpMessage { condition: Op, message: Op },
    /// A single op producing a `BooleanWithMessage`
    Composite(Op),
}

impl StepCondition {
    pub fn literal(condition: Op, message: Option<&str>) -> Self {
        StepCondition::Literal {
            condition,
            message: message.map(str::to_string),
        }
    }

    pub fn op_message(condition: Op, message: Op) -> Self {
        StepCondition::OpMessage { condition, message }
    }

    pub fn composite(condition: Op) -> Self {
        StepCondition::Composite(condition)
    }
}

/// What a validation pipeline does after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationStepAction {
    NextStep,
    StopAsValid,
    StopAsInvalid,
    StopAsNotApplicable,
    StopToAbort,
}

/// What an availability check pipeline does after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AvailabilityCheckStepAction {
    NextStep,
    StopAsEnabled,
    StopAsDisabled,
}

/// One step of a pipeline
#[derive(Debug, Clone)]
pub struct Step<A> {
    pub condition: StepCondition,
    /// Action taken when the condition is true
    pub on_true: A,
    /// Action taken when the condition is false
    pub on_false: A,
}

impl<A: Copy> Step<A> {
    pub fn new(condition: StepCondition, on_true: A, on_false: A) -> Self {
        Self {
            condition,
            on_true,
            on_false,
        }
    }

    /// Step with a boolean condition and a literal message
    pub fn literal(condition: Op, message: &str, on_true: A, on_false: A) -> Self {
        Self::new(
            StepCondition::literal(condition, Some(message)),
            on_true,
            on_false,
        )
    }

    /// Look up the action for a condition outcome
    pub fn action(&self, outcome: bool) -> A {
        if outcome {
            self.on_true
        } else {
            self.on_false
        }
    }
}

/// Pipeline of a `Validate` op
#[derive(Debug, Clone)]
pub struct ValidationChain {
    pub steps: Vec<Step<ValidationStepAction>>,
    pub end_validity: Validity,
    pub end_message: Option<String>,
}

impl Default for ValidationChain {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            end_validity: Validity::Valid,
            end_message: None,
        }
    }
}

impl ValidationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step<ValidationStepAction>) -> Self {
        self.steps.push(step);
        self
    }

    /// Result used when every step resolves to `NextStep`
    pub fn ends_with(mut self, validity: Validity, message: Option<&str>) -> Self {
        self.end_validity = validity;
        self.end_message = message.map(str::to_string);
        self
    }
}

/// Pipeline of a `CheckAvailability` op
#[derive(Debug, Clone)]
pub struct AvailabilityCheckChain {
    pub steps: Vec<Step<AvailabilityCheckStepAction>>,
    pub end_availability: Availability,
    pub end_message: Option<String>,
}

impl Default for AvailabilityCheckChain {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            end_availability: Availability::Enabled,
            end_message: None,
        }
    }
}

impl AvailabilityCheckChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step<AvailabilityCheckStepAction>) -> Self {
        self.steps.push(step);
        self
    }

    /// Result used when every step resolves to `NextStep`
    pub fn ends_with(mut self, availability: Availability, message: Option<&str>) -> Self {
        self.end_availability = availability;
        self.end_message = message.map(str::to_string);
        self
    }
}
