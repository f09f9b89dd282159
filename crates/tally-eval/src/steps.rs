//! Step pipeline execution for `Validate` and `CheckAvailability`

use tally_core::{
    Availability, AvailabilityCheckChain, AvailabilityCheckStepAction, Op, StepCondition,
    ValidationChain, ValidationStepAction, Validity, Value, ValueType,
};
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::{OpError, OpResult};

/// A step's message, possibly not computed yet
enum StepMessage<'o> {
    Ready(Option<String>),
    /// Evaluated only if the step stops the pipeline
    Deferred(&'o Op),
}

impl<'a> ExecutionContext<'a> {
    async fn step_outcome<'o>(
        &self,
        condition: &'o StepCondition,
    ) -> OpResult<(bool, StepMessage<'o>)> {
        match condition {
            StepCondition::Literal { condition, message } => Ok((
                self.evaluate_bool(condition, "Step").await?,
                StepMessage::Ready(message.clone()),
            )),
            StepCondition::OpMessage { condition, message } => Ok((
                self.evaluate_bool(condition, "Step").await?,
                StepMessage::Deferred(message),
            )),
            StepCondition::Composite(op) => match self.evaluate(op).await? {
                Value::BooleanWithMessage { value, message } => {
                    Ok((value, StepMessage::Ready(message)))
                }
                other => Err(OpError::TypeMismatch {
                    op: "Step",
                    expected: ValueType::BooleanWithMessage,
                    actual: other.value_type(),
                }),
            },
        }
    }

    async fn step_message(&self, message: StepMessage<'_>) -> OpResult<Option<String>> {
        match message {
            StepMessage::Ready(message) => Ok(message),
            StepMessage::Deferred(op) => self.evaluate_message(Some(op)).await,
        }
    }

    /// Run a validation pipeline, stopping at the first terminal action
    pub(crate) async fn run_validation(&self, chain: &ValidationChain) -> OpResult<Value> {
        for (index, step) in chain.steps.iter().enumerate() {
            let (outcome, message) = self.step_outcome(&step.condition).await?;
            let action = step.action(outcome);
            trace!(step = index, outcome, ?action, "validation step");

            let validity = match action {
                ValidationStepAction::NextStep => continue,
                ValidationStepAction::StopAsValid => Validity::Valid,
                ValidationStepAction::StopAsInvalid => Validity::Invalid,
                ValidationStepAction::StopAsNotApplicable => {
                    return Err(OpError::NotApplicable {
                        message: self.step_message(message).await?,
                    })
                }
                ValidationStepAction::StopToAbort => {
                    return Err(OpError::Aborted {
                        message: self.step_message(message).await?,
                    })
                }
            };
            return Ok(Value::ValidationResult {
                validity,
                message: self.step_message(message).await?,
            });
        }

        Ok(Value::ValidationResult {
            validity: chain.end_validity,
            message: chain.end_message.clone(),
        })
    }

    /// Run an availability check pipeline, stopping at the first terminal action
    pub(crate) async fn run_availability_check(
        &self,
        chain: &AvailabilityCheckChain,
    ) -> OpResult<Value> {
        for (index, step) in chain.steps.iter().enumerate() {
            let (outcome, message) = self.step_outcome(&step.condition).await?;
            let action = step.action(outcome);
            trace!(step = index, outcome, ?action, "availability check step");

            let availability = match action {
                AvailabilityCheckStepAction::NextStep => continue,
                AvailabilityCheckStepAction::StopAsEnabled => Availability::Enabled,
                AvailabilityCheckStepAction::StopAsDisabled => Availability::Disabled,
            };
            return Ok(Value::AvailabilityCheckResult {
                availability,
                message: self.step_message(message).await?,
            });
        }

        Ok(Value::AvailabilityCheckResult {
            availability: chain.end_availability,
            message: chain.end_message.clone(),
        })
    }
}
