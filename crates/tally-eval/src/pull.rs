//! Pull-based derivation of cell state
//!
//! Reading another cell never looks at events recorded during the running
//! pass. Values, availabilities, validation results and operation outcomes
//! are derived again from the cell's specification each time they are
//! read. Derivation is free of side effects, so repeating it is safe.

use tally_core::{
    Availability, AvailabilityCheckOutcome, CellHandle, Concern, Error, HasAvailabilityCheck,
    HasOperationOutput, HasValidation, NotSlottedCell, OpExecutionOutcome, ValidationOutcome,
    Validity, Value, ValueType,
};
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::{OpError, OpResult, SoftOutcome};

/// What reading a cell's value produced
#[derive(Debug, Clone, PartialEq)]
pub enum CellRead {
    Value(Value),
    /// The cell has no value (unset input, incomplete operation, null cell)
    Missing,
    /// The cell is disabled, so its value is hidden
    Disabled,
}

impl<'a> ExecutionContext<'a> {
    fn not_slotted_cell(&self, target: CellHandle) -> OpResult<&'a NotSlottedCell> {
        let cache = self.cache();
        cache.not_slotted(target).ok_or_else(|| {
            OpError::Report(Error::invalid_operation(format!(
                "Cell {} is not a not-slotted cell of the report",
                cache.describe(target)
            )))
        })
    }

    /// Read the value of `target`, gated by its availability
    pub async fn read_value(&self, target: CellHandle) -> OpResult<CellRead> {
        // a cell's own availability check sees the cell ungated
        if !self.in_progress(target, Concern::AvailabilityCheck)
            && self.effective_availability(target).await? == Availability::Disabled
        {
            return Ok(CellRead::Disabled);
        }

        let read = match self.not_slotted_cell(target)? {
            NotSlottedCell::Const(cell) => CellRead::Value(cell.value().clone()),
            NotSlottedCell::Input(cell) => cell
                .value()
                .cloned()
                .map_or(CellRead::Missing, CellRead::Value),
            NotSlottedCell::Null(_) => CellRead::Missing,
            NotSlottedCell::Operation(_) => match self.op_outcome(target).await? {
                OpExecutionOutcome::Completed(value) => CellRead::Value(value),
                _ => CellRead::Missing,
            },
        };
        trace!(cell = %self.cache().describe(target), ?read, "read value");
        Ok(read)
    }

    /// Availability of `target` as of now
    ///
    /// The result of its availability check when the check determines one,
    /// the default availability otherwise. Cells without a check are enabled.
    pub async fn effective_availability(&self, target: CellHandle) -> OpResult<Availability> {
        let Some(check) = self.not_slotted_cell(target)?.availability_check() else {
            return Ok(Availability::Enabled);
        };
        let outcome = self.availability_outcome(target).await?;
        Ok(outcome
            .availability()
            .unwrap_or(check.default_availability()))
    }

    /// Derive the availability check outcome of `target` in a new frame
    pub async fn availability_outcome(
        &self,
        target: CellHandle,
    ) -> OpResult<AvailabilityCheckOutcome> {
        self.enter(target, Concern::AvailabilityCheck)?
            .derive_availability()
            .await
    }

    /// Derive the validation outcome of `target` in a new frame
    pub async fn validation_outcome(&self, target: CellHandle) -> OpResult<ValidationOutcome> {
        self.enter(target, Concern::Validation)?
            .derive_validation()
            .await
    }

    /// Derive the operation outcome of `target` in a new frame
    pub async fn op_outcome(&self, target: CellHandle) -> OpResult<OpExecutionOutcome> {
        self.enter(target, Concern::OpExecution)?
            .derive_op_execution()
            .await
    }

    /// Run the availability check of this frame's cell
    pub async fn derive_availability(&self) -> OpResult<AvailabilityCheckOutcome> {
        let cell = self.not_slotted_cell(self.cell())?;
        let check = cell.availability_check().ok_or_else(|| {
            OpError::Report(Error::invalid_operation(format!(
                "Cell {} has no availability check",
                self.cache().describe(self.cell())
            )))
        })?;

        match self.evaluate(check.op()).await {
            Ok(Value::AvailabilityCheckResult {
                availability,
                message,
            }) => Ok(match availability {
                Availability::Enabled => AvailabilityCheckOutcome::DeterminedEnabled(message),
                Availability::Disabled => AvailabilityCheckOutcome::DeterminedDisabled(message),
            }),
            Ok(other) => Err(OpError::TypeMismatch {
                op: "CheckAvailability",
                expected: ValueType::AvailabilityCheckResult,
                actual: other.value_type(),
            }),
            Err(err) => Ok(match err.into_soft()? {
                SoftOutcome::Aborted(m) => AvailabilityCheckOutcome::Aborted(m),
                SoftOutcome::NotApplicable(m) => AvailabilityCheckOutcome::DeemedNotApplicable(m),
                SoftOutcome::Failed(d) => AvailabilityCheckOutcome::Failed(d),
            }),
        }
    }

    /// Run the validation of this frame's cell
    ///
    /// A disabled cell is not validated; it is deemed not applicable.
    pub async fn derive_validation(&self) -> OpResult<ValidationOutcome> {
        let cell = self.not_slotted_cell(self.cell())?;
        let validation = cell.validation().ok_or_else(|| {
            OpError::Report(Error::invalid_operation(format!(
                "Cell {} has no validation",
                self.cache().describe(self.cell())
            )))
        })?;

        if self.effective_availability(self.cell()).await? == Availability::Disabled {
            return Ok(ValidationOutcome::DeemedNotApplicable(Some(
                "cell is disabled".to_string(),
            )));
        }

        match self.evaluate(validation.op()).await {
            Ok(Value::ValidationResult { validity, message }) => Ok(match validity {
                Validity::Valid => ValidationOutcome::DeterminedValid(message),
                Validity::Invalid => ValidationOutcome::DeterminedInvalid(message),
            }),
            Ok(other) => Err(OpError::TypeMismatch {
                op: "Validate",
                expected: ValueType::ValidationResult,
                actual: other.value_type(),
            }),
            Err(err) => Ok(match err.into_soft()? {
                SoftOutcome::Aborted(m) => ValidationOutcome::Aborted(m),
                SoftOutcome::NotApplicable(m) => ValidationOutcome::DeemedNotApplicable(m),
                SoftOutcome::Failed(d) => ValidationOutcome::Failed(d),
            }),
        }
    }

    /// Execute the operation of this frame's cell
    pub async fn derive_op_execution(&self) -> OpResult<OpExecutionOutcome> {
        let cell = self
            .not_slotted_cell(self.cell())?
            .as_operation()
            .ok_or_else(|| {
                OpError::Report(Error::invalid_operation(format!(
                    "Cell {} is not an operation cell",
                    self.cache().describe(self.cell())
                )))
            })?;

        match self.evaluate(cell.operation()).await {
            Ok(value) => Ok(OpExecutionOutcome::Completed(value)),
            Err(err) => Ok(match err.into_soft()? {
                SoftOutcome::Aborted(m) => OpExecutionOutcome::Aborted(m),
                SoftOutcome::NotApplicable(m) => OpExecutionOutcome::DeemedNotApplicable(m),
                SoftOutcome::Failed(d) => OpExecutionOutcome::Failed(d),
            }),
        }
    }
}
