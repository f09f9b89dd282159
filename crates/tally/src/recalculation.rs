//! Report recalculation engine
//!
//! A pass derives, for every cell carrying the capability, its availability,
//! its validation and its operation outcome, then appends one event per cell
//! per concern. Derivation reads the state committed before the pass; the
//! events of the pass are buffered and appended only once every concern of
//! every cell has been derived.
//!
//! # Example
//!
//! ```rust,ignore
//! use tally::prelude::*;
//!
//! let mut agent = ReportAgent::new(report)?;
//! agent.set_input_value(sales, Utc::now(), Decimal::from(4))?;
//! let stats = agent.recalc(&Utc::now(), &[])?;
//! println!("Executed {} operations", stats.operations);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::{
    AvailabilityCheckOutcome, CellHandle, Concern, Event, OpExecutionOutcome, ReportCache,
    ValidationOutcome,
};
use tally_eval::{Evaluator, OpError, ProtocolFactory, ProtocolFactoryChain, DEFAULT_MAX_DEPTH};
use tracing::{debug, info, warn};

use crate::error::{RecalcError, RecalcResult};

/// Options for a recalculation pass
#[derive(Debug, Clone)]
pub struct RecalcOptions {
    /// Run availability checks
    pub check_availability: bool,
    /// Run validations
    pub validate: bool,
    /// Execute operation cells
    pub execute_operations: bool,
    /// Maximum nesting of cell references followed while deriving a concern (default: 64)
    pub max_reference_depth: usize,
}

impl Default for RecalcOptions {
    fn default() -> Self {
        Self {
            check_availability: true,
            validate: true,
            execute_operations: true,
            max_reference_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Statistics from a recalculation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcStats {
    /// Number of availability checks run
    pub availability_checks: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// Number of validations run
    pub validations: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Number of operation cells executed
    pub operations: usize,
    pub completed: usize,
    /// Outcomes of any concern that were aborted
    pub aborted: usize,
    /// Outcomes of any concern that were deemed not applicable
    pub not_applicable: usize,
    /// Outcomes of any concern that failed
    pub failed: usize,
}

impl RecalcStats {
    /// Number of events the pass appended
    pub fn events(&self) -> usize {
        self.availability_checks + self.validations + self.operations
    }
}

/// Outcomes derived by a pass, not yet committed
#[derive(Debug, Default)]
pub(crate) struct PassOutcomes {
    availability: Vec<(CellHandle, AvailabilityCheckOutcome)>,
    validation: Vec<(CellHandle, ValidationOutcome)>,
    operations: Vec<(CellHandle, OpExecutionOutcome)>,
}

impl PassOutcomes {
    pub(crate) fn stats(&self) -> RecalcStats {
        let mut stats = RecalcStats {
            availability_checks: self.availability.len(),
            validations: self.validation.len(),
            operations: self.operations.len(),
            ..RecalcStats::default()
        };

        for (_, outcome) in &self.availability {
            match outcome {
                AvailabilityCheckOutcome::DeterminedEnabled(_) => stats.enabled += 1,
                AvailabilityCheckOutcome::DeterminedDisabled(_) => stats.disabled += 1,
                AvailabilityCheckOutcome::Aborted(_) => stats.aborted += 1,
                AvailabilityCheckOutcome::DeemedNotApplicable(_) => stats.not_applicable += 1,
                AvailabilityCheckOutcome::Failed(_) => stats.failed += 1,
                AvailabilityCheckOutcome::Cleared => {}
            }
        }
        for (_, outcome) in &self.validation {
            match outcome {
                ValidationOutcome::DeterminedValid(_) => stats.valid += 1,
                ValidationOutcome::DeterminedInvalid(_) => stats.invalid += 1,
                ValidationOutcome::Aborted(_) => stats.aborted += 1,
                ValidationOutcome::DeemedNotApplicable(_) => stats.not_applicable += 1,
                ValidationOutcome::Failed(_) => stats.failed += 1,
                ValidationOutcome::Cleared => {}
            }
        }
        for (_, outcome) in &self.operations {
            match outcome {
                OpExecutionOutcome::Completed(_) => stats.completed += 1,
                OpExecutionOutcome::Aborted(_) => stats.aborted += 1,
                OpExecutionOutcome::DeemedNotApplicable(_) => stats.not_applicable += 1,
                OpExecutionOutcome::Failed(_) => stats.failed += 1,
                OpExecutionOutcome::Cleared => {}
            }
        }

        stats
    }

    /// Append the derived outcomes to the cells' event logs
    pub(crate) fn commit(
        self,
        cache: &mut ReportCache,
        timestamp: DateTime<Utc>,
    ) -> RecalcResult<RecalcStats> {
        let stats = self.stats();

        for (cell, outcome) in self.availability {
            cache.record_availability_check(cell, Event::new(timestamp, outcome))?;
        }
        for (cell, outcome) in self.validation {
            cache.record_validation(cell, Event::new(timestamp, outcome))?;
        }
        for (cell, outcome) in self.operations {
            cache.record_op_execution(cell, Event::new(timestamp, outcome))?;
        }

        Ok(stats)
    }
}

/// Derives the outcomes of one pass
pub(crate) struct RecalcEngine<'a> {
    cache: &'a ReportCache,
    options: &'a RecalcOptions,
    protocols: ProtocolFactoryChain,
}

impl<'a> RecalcEngine<'a> {
    /// `protocols` are asked in order; the first factory with a protocol wins
    pub(crate) fn new<I>(cache: &'a ReportCache, options: &'a RecalcOptions, protocols: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ProtocolFactory>>,
    {
        Self {
            cache,
            options,
            protocols: protocols.into_iter().collect(),
        }
    }

    /// Derive every enabled concern of every cell, in index order
    pub(crate) async fn derive(&self) -> RecalcResult<PassOutcomes> {
        let evaluator = Evaluator::new(self.cache, &self.protocols)
            .with_max_depth(self.options.max_reference_depth);
        let mut outcomes = PassOutcomes::default();

        // Phase 1: Availability
        if self.options.check_availability {
            for &cell in self.cache.availability_check_cells() {
                let outcome = evaluator
                    .check_availability(cell)
                    .await
                    .map_err(|e| self.fatal(cell, Concern::AvailabilityCheck, e))?;
                debug!(
                    cell = %self.cache.describe(cell),
                    status = %outcome.status(),
                    message = outcome.message(),
                    "availability checked"
                );
                outcomes.availability.push((cell, outcome));
            }
        }

        // Phase 2: Validation
        if self.options.validate {
            for &cell in self.cache.validation_cells() {
                let outcome = evaluator
                    .validate(cell)
                    .await
                    .map_err(|e| self.fatal(cell, Concern::Validation, e))?;
                debug!(
                    cell = %self.cache.describe(cell),
                    status = %outcome.status(),
                    message = outcome.message(),
                    "validated"
                );
                outcomes.validation.push((cell, outcome));
            }
        }

        // Phase 3: Operations
        if self.options.execute_operations {
            for &cell in self.cache.operation_cells() {
                let outcome = evaluator
                    .execute_operation(cell)
                    .await
                    .map_err(|e| self.fatal(cell, Concern::OpExecution, e))?;
                debug!(
                    cell = %self.cache.describe(cell),
                    status = %outcome.status(),
                    "operation executed"
                );
                outcomes.operations.push((cell, outcome));
            }
        }

        Ok(outcomes)
    }

    fn fatal(&self, cell: CellHandle, concern: Concern, source: OpError) -> RecalcError {
        let cell = self.cache.describe(cell);
        warn!(%cell, %concern, error = %source, "recalculation abandoned");
        RecalcError::Evaluation {
            cell,
            concern,
            source,
        }
    }
}

/// Run a full pass over `cache`
pub(crate) async fn recalculate(
    cache: &mut ReportCache,
    options: &RecalcOptions,
    protocols: Vec<Arc<dyn ProtocolFactory>>,
    timestamp: DateTime<Utc>,
) -> RecalcResult<RecalcStats> {
    info!(
        report = cache.report().id(),
        %timestamp,
        availability_checks = cache.availability_check_cells().len(),
        validations = cache.validation_cells().len(),
        operations = cache.operation_cells().len(),
        "recalculating"
    );

    let outcomes = RecalcEngine::new(cache, options, protocols).derive().await?;
    let stats = outcomes.commit(cache, timestamp)?;

    info!(
        report = cache.report().id(),
        events = stats.events(),
        aborted = stats.aborted,
        not_applicable = stats.not_applicable,
        failed = stats.failed,
        "recalculated"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tally_core::{
        CellLocator, Column, HasOperationOutput, InputCell, Op, OperationCell, Report, Row,
        Section, Step, TreeTable, ValidationChain, ValidationStepAction, Value, ValueType,
    };

    fn report() -> (ReportCache, CellHandle, CellHandle) {
        let mut report = Report::new("r");
        let input = report.add_cell(
            InputCell::new(ValueType::Boolean)
                .with_id("flag")
                .with_validation(Op::Validate(ValidationChain::new().step(Step::literal(
                    Op::has_value(CellLocator::this()),
                    "flag required",
                    ValidationStepAction::NextStep,
                    ValidationStepAction::StopAsInvalid,
                ))))
                .unwrap(),
        );
        let op = report.add_cell(
            OperationCell::new(Op::not(Op::get_value(
                CellLocator::section("flag"),
                ValueType::Boolean,
            )))
            .unwrap()
            .with_id("negated"),
        );
        report.add_section(Section::new(
            "s",
            TreeTable::new(vec![Column::new("value")])
                .with_data_row(Row::with_cells(vec![input]))
                .with_data_row(Row::with_cells(vec![op])),
        ));
        (ReportCache::new(report).unwrap(), input, op)
    }

    #[tokio::test]
    async fn test_stats() {
        let (mut cache, _, _) = report();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let stats = recalculate(&mut cache, &RecalcOptions::default(), Vec::new(), timestamp)
            .await
            .unwrap();
        assert_eq!(
            stats,
            RecalcStats {
                validations: 1,
                invalid: 1,
                operations: 1,
                aborted: 1,
                ..RecalcStats::default()
            }
        );
        assert_eq!(stats.events(), 2);
    }

    #[tokio::test]
    async fn test_phase_toggles() {
        let (mut cache, input, op) = report();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        cache
            .set_input_value(input, timestamp, Value::Boolean(true))
            .unwrap();

        let options = RecalcOptions {
            validate: false,
            ..RecalcOptions::default()
        };
        let stats = recalculate(&mut cache, &options, Vec::new(), timestamp)
            .await
            .unwrap();
        assert_eq!(stats.validations, 0);
        assert_eq!(stats.completed, 1);

        let op_events = cache
            .not_slotted(op)
            .and_then(|c| c.as_operation())
            .map(|c| c.op_events().len());
        assert_eq!(op_events, Some(1));
    }
}
