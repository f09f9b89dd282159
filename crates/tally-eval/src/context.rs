//! Execution context and the built-in op interpreter
//!
//! An [`ExecutionContext`] is one frame of a pull-based evaluation: the
//! cell and concern being derived, plus a link to the frame that asked for
//! it. Frames form a stack through which circular references and runaway
//! nesting are detected.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};
use rust_decimal::Decimal;
use tally_core::{
    CellCapability, CellHandle, CompareOperator, Concern, CustomOp, Op, ReportCache, Value,
    ValueType,
};
use tracing::trace;

use crate::error::{OpError, OpResult};
use crate::protocol::ProtocolFactory;
use crate::pull::CellRead;

/// Default bound on nested cell references
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// One frame of an evaluation
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    cache: &'a ReportCache,
    protocols: &'a dyn ProtocolFactory,
    cell: CellHandle,
    concern: Concern,
    parent: Option<&'a ExecutionContext<'a>>,
    depth: usize,
    max_depth: usize,
}

impl<'a> ExecutionContext<'a> {
    /// Create a root frame deriving `concern` for `cell`
    pub fn new(
        cache: &'a ReportCache,
        protocols: &'a dyn ProtocolFactory,
        cell: CellHandle,
        concern: Concern,
    ) -> Self {
        Self {
            cache,
            protocols,
            cell,
            concern,
            parent: None,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cache(&self) -> &'a ReportCache {
        self.cache
    }

    pub fn protocols(&self) -> &'a dyn ProtocolFactory {
        self.protocols
    }

    /// The cell this frame derives a concern of
    pub fn cell(&self) -> CellHandle {
        self.cell
    }

    pub fn concern(&self) -> Concern {
        self.concern
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check if `concern` of `cell` is being derived by this frame or an ancestor
    pub fn in_progress(&self, cell: CellHandle, concern: Concern) -> bool {
        let mut frame = Some(self);
        while let Some(ctx) = frame {
            if ctx.cell == cell && ctx.concern == concern {
                return true;
            }
            frame = ctx.parent;
        }
        false
    }

    /// Push a frame deriving `concern` of `cell`
    pub fn enter(&self, cell: CellHandle, concern: Concern) -> OpResult<ExecutionContext<'_>> {
        if self.in_progress(cell, concern) {
            return Err(OpError::CircularReference {
                cell: self.cache.describe(cell),
                concern,
            });
        }
        if self.depth >= self.max_depth {
            return Err(OpError::DepthExceeded(self.max_depth));
        }
        trace!(
            cell = %self.cache.describe(cell),
            %concern,
            depth = self.depth + 1,
            "pulling"
        );
        Ok(ExecutionContext {
            cache: self.cache,
            protocols: self.protocols,
            cell,
            concern,
            parent: Some(self),
            depth: self.depth + 1,
            max_depth: self.max_depth,
        })
    }

    /// Evaluate an op in this frame
    pub fn evaluate<'s>(&'s self, op: &'s Op) -> BoxFuture<'s, OpResult<Value>> {
        async move {
            match op {
                Op::Const(value) => Ok(value.clone()),
                Op::IfThenElse {
                    condition,
                    then,
                    otherwise,
                } => {
                    if self.evaluate_bool(condition, "IfThenElse").await? {
                        self.evaluate(then).await
                    } else {
                        self.evaluate(otherwise).await
                    }
                }
                Op::IsEqualTo { left, right } => {
                    let left = self.evaluate(left).await?;
                    let right = self.evaluate(right).await?;
                    Ok(Value::Boolean(values_equal(&left, &right)))
                }
                Op::AndAlso(ops) => {
                    for op in ops {
                        if !self.evaluate_bool(op, "AndAlso").await? {
                            return Ok(Value::Boolean(false));
                        }
                    }
                    Ok(Value::Boolean(true))
                }
                Op::OrElse(ops) => {
                    for op in ops {
                        if self.evaluate_bool(op, "OrElse").await? {
                            return Ok(Value::Boolean(true));
                        }
                    }
                    Ok(Value::Boolean(false))
                }
                Op::Not(op) => Ok(Value::Boolean(!self.evaluate_bool(op, "Not").await?)),
                Op::Sum(ops) => self.sum(op, ops).await,
                Op::Compare {
                    left,
                    operator,
                    right,
                } => {
                    let left = self.evaluate_decimal(left, "Compare").await?;
                    let right = self.evaluate_decimal(right, "Compare").await?;
                    Ok(Value::Boolean(match operator {
                        CompareOperator::GreaterThan => left > right,
                        CompareOperator::GreaterThanOrEqualTo => left >= right,
                        CompareOperator::LessThan => left < right,
                        CompareOperator::LessThanOrEqualTo => left <= right,
                    }))
                }
                Op::Divide {
                    numerator,
                    denominator,
                } => {
                    let numerator = self.evaluate_decimal(numerator, "Divide").await?;
                    let denominator = self.evaluate_decimal(denominator, "Divide").await?;
                    if denominator.is_zero() {
                        return Err(OpError::DivideByZero);
                    }
                    numerator
                        .checked_div(denominator)
                        .map(Value::Decimal)
                        .ok_or(OpError::Overflow("Divide"))
                }
                Op::GetNumberOfSignificantDigits(op) => {
                    let value = self
                        .evaluate_decimal(op, "GetNumberOfSignificantDigits")
                        .await?;
                    Ok(Value::Integer(i64::from(value.normalize().scale())))
                }
                Op::HasValue(locator) => {
                    let target = self.cache.resolve(locator, self.cell)?;
                    let read = self.read_value(target).await?;
                    Ok(Value::Boolean(matches!(read, CellRead::Value(_))))
                }
                Op::GetValue {
                    locator,
                    value_type,
                } => {
                    let target = self.cache.resolve(locator, self.cell)?;
                    match self.read_value(target).await? {
                        CellRead::Value(value) => coerce(value, *value_type, "GetValue"),
                        CellRead::Missing => Err(OpError::aborted(format!(
                            "cell {} has no value",
                            self.cache.describe(target)
                        ))),
                        CellRead::Disabled => Err(OpError::aborted(format!(
                            "cell {} is disabled",
                            self.cache.describe(target)
                        ))),
                    }
                }
                Op::GetOpExecutionStatus(locator) => {
                    let target =
                        self.cache
                            .resolve_with(locator, self.cell, CellCapability::Operation)?;
                    let outcome = self.op_outcome(target).await?;
                    Ok(Value::OpExecutionStatus(outcome.status()))
                }
                Op::GetValidationStatus(locator) => {
                    let target =
                        self.cache
                            .resolve_with(locator, self.cell, CellCapability::Validation)?;
                    let outcome = self.validation_outcome(target).await?;
                    Ok(Value::ValidationStatus(outcome.status()))
                }
                Op::GetAvailability(locator) => {
                    let target = self.cache.resolve(locator, self.cell)?;
                    Ok(Value::Availability(
                        self.effective_availability(target).await?,
                    ))
                }
                Op::Abort { message, .. } => Err(OpError::Aborted {
                    message: self.evaluate_message(message.as_deref()).await?,
                }),
                Op::NotApplicable { message, .. } => Err(OpError::NotApplicable {
                    message: self.evaluate_message(message.as_deref()).await?,
                }),
                Op::Validate(chain) => self.run_validation(chain).await,
                Op::CheckAvailability(chain) => self.run_availability_check(chain).await,
                Op::Custom(custom) => self.execute_custom(custom.as_ref()).await,
            }
        }
        .boxed()
    }

    pub(crate) async fn evaluate_bool(&self, op: &Op, parent: &'static str) -> OpResult<bool> {
        match self.evaluate(op).await? {
            Value::Boolean(b) => Ok(b),
            other => Err(OpError::TypeMismatch {
                op: parent,
                expected: ValueType::Boolean,
                actual: other.value_type(),
            }),
        }
    }

    async fn evaluate_decimal(&self, op: &Op, parent: &'static str) -> OpResult<Decimal> {
        let value = self.evaluate(op).await?;
        value.as_decimal().ok_or_else(|| OpError::TypeMismatch {
            op: parent,
            expected: ValueType::Decimal,
            actual: value.value_type(),
        })
    }

    /// Evaluate an optional text op
    pub(crate) async fn evaluate_message(&self, message: Option<&Op>) -> OpResult<Option<String>> {
        let Some(op) = message else {
            return Ok(None);
        };
        match self.evaluate(op).await? {
            Value::Text(text) => Ok(Some(text)),
            other => Err(OpError::TypeMismatch {
                op: "message",
                expected: ValueType::Text,
                actual: other.value_type(),
            }),
        }
    }

    async fn sum(&self, op: &Op, ops: &[Op]) -> OpResult<Value> {
        if op.return_type() == ValueType::Integer {
            let mut total: i64 = 0;
            for op in ops {
                let value = match self.evaluate(op).await? {
                    Value::Integer(i) => i,
                    other => {
                        return Err(OpError::TypeMismatch {
                            op: "Sum",
                            expected: ValueType::Integer,
                            actual: other.value_type(),
                        })
                    }
                };
                total = total.checked_add(value).ok_or(OpError::Overflow("Sum"))?;
            }
            return Ok(Value::Integer(total));
        }

        let mut total = Decimal::ZERO;
        for op in ops {
            let value = self.evaluate_decimal(op, "Sum").await?;
            total = total.checked_add(value).ok_or(OpError::Overflow("Sum"))?;
        }
        Ok(Value::Decimal(total))
    }

    async fn execute_custom(&self, custom: &dyn CustomOp) -> OpResult<Value> {
        let return_type = custom.return_type();
        let protocol = self
            .protocols
            .protocol_for(custom.kind(), return_type)
            .ok_or_else(|| OpError::NoProtocol {
                kind: custom.kind().to_string(),
                return_type,
            })?;
        let value = protocol.execute(custom, self).await?;
        if value.value_type() != return_type {
            return Err(OpError::TypeMismatch {
                op: custom.kind(),
                expected: return_type,
                actual: value.value_type(),
            });
        }
        Ok(value)
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cell", &self.cell)
            .field("concern", &self.concern)
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Numbers compare by value regardless of representation
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_decimal(), right.as_decimal()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

/// Check a pulled value against the requested type, widening integers
fn coerce(value: Value, expected: ValueType, op: &'static str) -> OpResult<Value> {
    match (expected, value) {
        (ValueType::Decimal, Value::Integer(i)) => Ok(Value::Decimal(Decimal::from(i))),
        (expected, value) if value.value_type() == expected => Ok(value),
        (expected, value) => Err(OpError::TypeMismatch {
            op,
            expected,
            actual: value.value_type(),
        }),
    }
}
