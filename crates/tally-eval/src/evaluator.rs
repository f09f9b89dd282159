//! Entry points for deriving cell state

use tally_core::{
    AvailabilityCheckOutcome, CellHandle, Concern, Op, OpExecutionOutcome, ReportCache,
    ValidationOutcome, Value,
};

use crate::context::{ExecutionContext, DEFAULT_MAX_DEPTH};
use crate::error::OpResult;
use crate::protocol::ProtocolFactory;

/// Derives availability, validation and operation outcomes over a report
///
/// Each call starts a fresh pull-based evaluation. Nothing is cached
/// between calls and nothing is written to the report.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    cache: &'a ReportCache,
    protocols: &'a dyn ProtocolFactory,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(cache: &'a ReportCache, protocols: &'a dyn ProtocolFactory) -> Self {
        Self {
            cache,
            protocols,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound nested cell references
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cache(&self) -> &'a ReportCache {
        self.cache
    }

    /// Root frame deriving `concern` of `cell`
    pub fn context(&self, cell: CellHandle, concern: Concern) -> ExecutionContext<'a> {
        ExecutionContext::new(self.cache, self.protocols, cell, concern)
            .with_max_depth(self.max_depth)
    }

    /// Run the availability check of `cell`
    pub async fn check_availability(&self, cell: CellHandle) -> OpResult<AvailabilityCheckOutcome> {
        self.context(cell, Concern::AvailabilityCheck)
            .derive_availability()
            .await
    }

    /// Run the validation of `cell`
    pub async fn validate(&self, cell: CellHandle) -> OpResult<ValidationOutcome> {
        self.context(cell, Concern::Validation)
            .derive_validation()
            .await
    }

    /// Execute the operation of `cell`
    pub async fn execute_operation(&self, cell: CellHandle) -> OpResult<OpExecutionOutcome> {
        self.context(cell, Concern::OpExecution)
            .derive_op_execution()
            .await
    }

    /// Evaluate a free-standing op on behalf of `current`
    pub async fn evaluate(&self, op: &Op, current: CellHandle) -> OpResult<Value> {
        self.context(current, Concern::OpExecution)
            .evaluate(op)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpError;
    use crate::protocol::{Protocol, ProtocolRegistry};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tally_core::{
        Availability, AvailabilityCheckChain, AvailabilityCheckStepAction, CellCapability,
        CellLocator, Column, CompareOperator, ConstCell, CustomOp, Decimal, Error, InputCell,
        NotFoundReason, OperationCell, Report, Row, Section, Step, StepCondition, TreeTable,
        ValidationChain, ValidationStatus, ValidationStepAction, Validity, ValueType,
    };

    #[derive(Debug)]
    struct Probe(ValueType);

    impl CustomOp for Probe {
        fn kind(&self) -> &'static str {
            "probe"
        }

        fn return_type(&self) -> ValueType {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Counts executions and returns a fixed value
    struct Counting {
        calls: Arc<AtomicUsize>,
        value: Value,
    }

    #[async_trait]
    impl Protocol for Counting {
        async fn execute(&self, _op: &dyn CustomOp, _ctx: &ExecutionContext<'_>) -> OpResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    fn probe(value_type: ValueType) -> Op {
        Op::custom(Probe(value_type))
    }

    fn counting_registry(value: Value) -> (ProtocolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let value_type = value.value_type();
        let registry = ProtocolRegistry::new().with(
            "probe",
            value_type,
            Counting {
                calls: calls.clone(),
                value,
            },
        );
        (registry, calls)
    }

    struct Fixture {
        cache: ReportCache,
        amount: CellHandle,
        hidden: CellHandle,
        looping: CellHandle,
        chain_start: CellHandle,
    }

    fn fixture() -> Fixture {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut report = Report::new("r");

        let amount = report.add_cell(InputCell::new(ValueType::Decimal).with_id("amount"));

        let mut hidden = InputCell::new(ValueType::Decimal)
            .with_id("hidden")
            .with_availability_check(
                Op::CheckAvailability(
                    AvailabilityCheckChain::new().ends_with(Availability::Disabled, Some("off")),
                ),
                Availability::Enabled,
            )
            .unwrap();
        hidden.set_value(ts, Value::Integer(3)).unwrap();
        let hidden = report.add_cell(hidden);

        let two = report.add_cell(ConstCell::new(2i64).with_id("two"));
        let looping = report.add_cell(
            OperationCell::new(Op::get_value(
                CellLocator::section("loop"),
                ValueType::Decimal,
            ))
            .unwrap()
            .with_id("loop"),
        );
        let chain_start = report.add_cell(
            OperationCell::new(Op::get_value(CellLocator::section("b"), ValueType::Decimal))
                .unwrap()
                .with_id("a"),
        );
        let b = report.add_cell(
            OperationCell::new(Op::get_value(CellLocator::section("c"), ValueType::Decimal))
                .unwrap()
                .with_id("b"),
        );
        let c = report.add_cell(
            OperationCell::new(Op::constant(Decimal::ONE))
                .unwrap()
                .with_id("c"),
        );

        let mut table = TreeTable::new(vec![Column::new("value")]);
        for cell in [amount, hidden, two, looping, chain_start, b, c] {
            table = table.with_data_row(Row::with_cells(vec![cell]));
        }
        report.add_section(Section::new("s", table));

        Fixture {
            cache: ReportCache::new(report).unwrap(),
            amount,
            hidden,
            looping,
            chain_start,
        }
    }

    #[tokio::test]
    async fn test_and_also_short_circuits() {
        let f = fixture();
        let (registry, calls) = counting_registry(Value::Boolean(true));
        let evaluator = Evaluator::new(&f.cache, &registry);

        let op = Op::and_also(vec![
            Op::constant(true),
            Op::constant(true),
            Op::constant(false),
            Op::abort(ValueType::Boolean),
            probe(ValueType::Boolean),
        ]);
        let value = evaluator.evaluate(&op, f.amount).await.unwrap();
        assert_eq!(value, Value::Boolean(false));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let op = Op::and_also(vec![probe(ValueType::Boolean), Op::constant(true)]);
        assert_eq!(
            evaluator.evaluate(&op, f.amount).await.unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_or_else_short_circuits() {
        let f = fixture();
        let (registry, calls) = counting_registry(Value::Boolean(false));
        let evaluator = Evaluator::new(&f.cache, &registry);

        let op = Op::or_else(vec![
            Op::constant(false),
            Op::constant(false),
            Op::constant(true),
            Op::abort(ValueType::Boolean),
            probe(ValueType::Boolean),
        ]);
        assert_eq!(
            evaluator.evaluate(&op, f.amount).await.unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let op = Op::or_else(vec![Op::constant(false), probe(ValueType::Boolean)]);
        assert_eq!(
            evaluator.evaluate(&op, f.amount).await.unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_reaches_the_top() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let op = Op::and_also(vec![Op::constant(true), Op::abort_with(ValueType::Boolean, "stop")]);
        match evaluator.evaluate(&op, f.amount).await {
            Err(OpError::Aborted { message }) => assert_eq!(message.as_deref(), Some("stop")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminal_step_skips_later_steps() {
        let f = fixture();
        let (registry, calls) = counting_registry(Value::Boolean(true));
        let evaluator = Evaluator::new(&f.cache, &registry);

        let chain = ValidationChain::new()
            .step(Step::literal(
                Op::constant(false),
                "first",
                ValidationStepAction::NextStep,
                ValidationStepAction::StopAsInvalid,
            ))
            .step(Step::literal(
                probe(ValueType::Boolean),
                "second",
                ValidationStepAction::NextStep,
                ValidationStepAction::StopAsInvalid,
            ));
        let value = evaluator
            .evaluate(&Op::Validate(chain), f.amount)
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::ValidationResult {
                validity: Validity::Invalid,
                message: Some("first".into())
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_op_message_is_lazy() {
        let f = fixture();
        let (registry, calls) = counting_registry(Value::text("computed"));
        let evaluator = Evaluator::new(&f.cache, &registry);

        let step = |condition: bool| {
            Step::new(
                StepCondition::op_message(Op::constant(condition), probe(ValueType::Text)),
                AvailabilityCheckStepAction::NextStep,
                AvailabilityCheckStepAction::StopAsDisabled,
            )
        };

        let chain = AvailabilityCheckChain::new().step(step(true));
        let value = evaluator
            .evaluate(&Op::CheckAvailability(chain), f.amount)
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::AvailabilityCheckResult {
                availability: Availability::Enabled,
                message: None
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let chain = AvailabilityCheckChain::new().step(step(false));
        let value = evaluator
            .evaluate(&Op::CheckAvailability(chain), f.amount)
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::AvailabilityCheckResult {
                availability: Availability::Disabled,
                message: Some("computed".into())
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_composite_step_and_stop_actions() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let chain = ValidationChain::new().step(Step::new(
            StepCondition::composite(Op::constant(Value::boolean_with_message(
                false,
                Some("no data"),
            ))),
            ValidationStepAction::NextStep,
            ValidationStepAction::StopAsNotApplicable,
        ));
        match evaluator.evaluate(&Op::Validate(chain), f.amount).await {
            Err(OpError::NotApplicable { message }) => {
                assert_eq!(message.as_deref(), Some("no data"))
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let chain = ValidationChain::new().ends_with(Validity::Invalid, Some("fallthrough"));
        assert_eq!(
            evaluator
                .evaluate(&Op::Validate(chain), f.amount)
                .await
                .unwrap(),
            Value::ValidationResult {
                validity: Validity::Invalid,
                message: Some("fallthrough".into())
            }
        );
    }

    #[tokio::test]
    async fn test_arithmetic() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let half = Op::divide(Op::constant(Decimal::from(5)), Op::constant(2i64));
        assert_eq!(
            evaluator.evaluate(&half, f.amount).await.unwrap(),
            Value::Decimal(Decimal::new(25, 1))
        );

        let sum = Op::sum(vec![Op::constant(2i64), Op::constant(3i64)]);
        assert_eq!(
            evaluator.evaluate(&sum, f.amount).await.unwrap(),
            Value::Integer(5)
        );

        let digits = Op::significant_digits(Op::constant(Decimal::new(2500, 3)));
        assert_eq!(
            evaluator.evaluate(&digits, f.amount).await.unwrap(),
            Value::Integer(1)
        );

        let compare = Op::compare(
            Op::constant(Decimal::new(-115, 1)),
            CompareOperator::GreaterThanOrEqualTo,
            Op::constant(0i64),
        );
        assert_eq!(
            evaluator.evaluate(&compare, f.amount).await.unwrap(),
            Value::Boolean(false)
        );

        let equal = Op::is_equal_to(Op::constant(2i64), Op::constant(Decimal::new(20, 1)));
        assert_eq!(
            evaluator.evaluate(&equal, f.amount).await.unwrap(),
            Value::Boolean(true)
        );
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_fatal() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let op = Op::divide(Op::constant(Decimal::ONE), Op::constant(Decimal::ZERO));
        let err = evaluator.evaluate(&op, f.amount).await.unwrap_err();
        assert!(matches!(err, OpError::DivideByZero));
        assert!(!err.is_soft());
    }

    #[tokio::test]
    async fn test_missing_and_disabled_values() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let has_amount = Op::has_value(CellLocator::section("amount"));
        assert_eq!(
            evaluator.evaluate(&has_amount, f.hidden).await.unwrap(),
            Value::Boolean(false)
        );
        let get_amount = Op::get_value(CellLocator::section("amount"), ValueType::Decimal);
        match evaluator.evaluate(&get_amount, f.hidden).await {
            Err(OpError::Aborted { message }) => {
                assert_eq!(message.as_deref(), Some("cell amount has no value"))
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // hidden holds 3 but its availability check disables it
        let has_hidden = Op::has_value(CellLocator::section("hidden"));
        assert_eq!(
            evaluator.evaluate(&has_hidden, f.amount).await.unwrap(),
            Value::Boolean(false)
        );
        let get_hidden = Op::get_value(CellLocator::section("hidden"), ValueType::Decimal);
        match evaluator.evaluate(&get_hidden, f.amount).await {
            Err(OpError::Aborted { message }) => {
                assert_eq!(message.as_deref(), Some("cell hidden is disabled"))
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // no validation to run
        assert!(evaluator.validate(f.hidden).await.is_err());
        assert_eq!(
            evaluator.check_availability(f.hidden).await.unwrap(),
            AvailabilityCheckOutcome::DeterminedDisabled(Some("off".into()))
        );
    }

    #[tokio::test]
    async fn test_status_reading_ops() {
        let mut report = Report::new("status");
        let gated = report.add_cell(
            InputCell::new(ValueType::Decimal)
                .with_id("gated")
                .with_validation(Op::Validate(ValidationChain::new()))
                .unwrap()
                .with_availability_check(
                    Op::CheckAvailability(
                        AvailabilityCheckChain::new().ends_with(Availability::Disabled, None),
                    ),
                    Availability::Enabled,
                )
                .unwrap(),
        );
        let required = report.add_cell(
            InputCell::new(ValueType::Decimal)
                .with_id("required")
                .with_validation(Op::Validate(ValidationChain::new().step(Step::literal(
                    Op::has_value(CellLocator::this()),
                    "required",
                    ValidationStepAction::NextStep,
                    ValidationStepAction::StopAsInvalid,
                ))))
                .unwrap(),
        );
        let plain = report.add_cell(ConstCell::new(1i64).with_id("plain"));
        let mut table = TreeTable::new(vec![Column::new("value")]);
        for cell in [gated, required, plain] {
            table = table.with_data_row(Row::with_cells(vec![cell]));
        }
        report.add_section(Section::new("s", table));
        let cache = ReportCache::new(report).unwrap();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&cache, &registry);

        let availability = |id: &str| Op::GetAvailability(CellLocator::section(id));
        assert_eq!(
            evaluator.evaluate(&availability("gated"), plain).await.unwrap(),
            Value::Availability(Availability::Disabled)
        );
        // no check, always enabled
        assert_eq!(
            evaluator.evaluate(&availability("plain"), gated).await.unwrap(),
            Value::Availability(Availability::Enabled)
        );

        let validation = |id: &str| Op::GetValidationStatus(CellLocator::section(id));
        assert_eq!(
            evaluator.evaluate(&validation("gated"), plain).await.unwrap(),
            Value::ValidationStatus(ValidationStatus::DeemedNotApplicable)
        );
        assert_eq!(
            evaluator.evaluate(&validation("required"), plain).await.unwrap(),
            Value::ValidationStatus(ValidationStatus::Invalid)
        );
        match evaluator.evaluate(&validation("plain"), gated).await {
            Err(OpError::Report(Error::CellNotFound(err))) => assert_eq!(
                err.reason,
                NotFoundReason::CapabilityMismatch {
                    expected: CellCapability::Validation,
                    actual: "const",
                }
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_value_widens_integers() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        let op = Op::get_value(CellLocator::section("two"), ValueType::Decimal);
        assert_eq!(
            evaluator.evaluate(&op, f.amount).await.unwrap(),
            Value::Decimal(Decimal::from(2))
        );

        let op = Op::get_value(CellLocator::section("two"), ValueType::Text);
        assert!(matches!(
            evaluator.evaluate(&op, f.amount).await,
            Err(OpError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_circular_reference() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);

        match evaluator.execute_operation(f.looping).await {
            Err(OpError::CircularReference { cell, concern }) => {
                assert_eq!(cell, "loop");
                assert_eq!(concern, Concern::OpExecution);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reference_depth() {
        let f = fixture();
        let registry = ProtocolRegistry::new();

        let evaluator = Evaluator::new(&f.cache, &registry);
        assert_eq!(
            evaluator.execute_operation(f.chain_start).await.unwrap(),
            OpExecutionOutcome::Completed(Value::Decimal(Decimal::ONE))
        );

        let evaluator = Evaluator::new(&f.cache, &registry).with_max_depth(1);
        assert!(matches!(
            evaluator.execute_operation(f.chain_start).await,
            Err(OpError::DepthExceeded(1))
        ));
    }

    #[tokio::test]
    async fn test_missing_protocol_and_wrong_result_type() {
        let f = fixture();
        let registry = ProtocolRegistry::new();
        let evaluator = Evaluator::new(&f.cache, &registry);
        assert!(matches!(
            evaluator.evaluate(&probe(ValueType::Boolean), f.amount).await,
            Err(OpError::NoProtocol { .. })
        ));

        // registered for Boolean but produces Text
        let registry = ProtocolRegistry::new().with(
            "probe",
            ValueType::Boolean,
            Counting {
                calls: Arc::new(AtomicUsize::new(0)),
                value: Value::text("oops"),
            },
        );
        let evaluator = Evaluator::new(&f.cache, &registry);
        assert!(matches!(
            evaluator.evaluate(&probe(ValueType::Boolean), f.amount).await,
            Err(OpError::TypeMismatch {
                expected: ValueType::Boolean,
                actual: ValueType::Text,
                ..
            })
        ));
    }
}
