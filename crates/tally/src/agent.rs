//! Report agent
//!
//! [`ReportAgent`] owns an indexed report and is the entry point hosts use:
//! apply inputs, recalculate, read committed values.

use std::any::TypeId;
use std::sync::Arc;

use chrono::{DateTime, Local, Offset, TimeZone, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use tally_core::{
    Availability, CellHandle, Error, HasAvailabilityCheck, HasOperationOutput, NotSlottedCell,
    OpExecutionStatus, Report, ReportCache, Result, Value,
};
use tally_eval::ProtocolFactory;
use tracing::debug;

use crate::error::{RecalcError, RecalcResult};
use crate::recalculation::{recalculate, RecalcOptions, RecalcStats};

/// Owns a report and drives its recalculation
pub struct ReportAgent {
    cache: ReportCache,
    options: RecalcOptions,
    protocols: Vec<Arc<dyn ProtocolFactory>>,
}

impl ReportAgent {
    /// Index `report`
    ///
    /// Fails with a structural error if the report is malformed, e.g. if the
    /// same cell is placed twice.
    pub fn new(report: Report) -> Result<Self> {
        Ok(Self::from_cache(ReportCache::new(report)?))
    }

    pub fn from_cache(cache: ReportCache) -> Self {
        Self {
            cache,
            options: RecalcOptions::default(),
            protocols: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: RecalcOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_options(&mut self, options: RecalcOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &RecalcOptions {
        &self.options
    }

    /// Register a protocol factory used by every recalculation
    pub fn register_factory(&mut self, factory: Arc<dyn ProtocolFactory>) {
        self.protocols.push(factory);
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn report(&self) -> &Report {
        self.cache.report()
    }

    pub fn into_report(self) -> Report {
        self.cache.into_report()
    }

    // === Inputs ===

    pub fn set_input_value<V: Into<Value>>(
        &mut self,
        cell: CellHandle,
        timestamp: DateTime<Utc>,
        value: V,
    ) -> Result<()> {
        self.cache.set_input_value(cell, timestamp, value.into())
    }

    pub fn clear_input_value(
        &mut self,
        cell: CellHandle,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        self.cache.clear_input_value(cell, timestamp, details)
    }

    /// Append a `Cleared` event to every availability, validation and
    /// operation log of the report
    pub fn clear_derived_state(
        &mut self,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        let availability = self.cache.availability_check_cells().to_vec();
        let validation = self.cache.validation_cells().to_vec();
        let operations = self.cache.operation_cells().to_vec();

        for cell in availability {
            self.cache.clear_availability_check(cell, timestamp, details)?;
        }
        for cell in validation {
            self.cache.clear_validation(cell, timestamp, details)?;
        }
        for cell in operations {
            self.cache.clear_op_execution(cell, timestamp, details)?;
        }
        Ok(())
    }

    // === Committed state ===

    /// The committed value of `cell`
    ///
    /// A slotted cell is read through its default slot. Fails if the cell
    /// is disabled, has no value, or its operation has not completed.
    pub fn get_cell_value(&self, cell: CellHandle) -> Result<&Value> {
        let name = self.cache.describe(cell);
        let target = self.value_cell(cell)?;

        if target.availability() == Availability::Disabled {
            return Err(Error::CellDisabled(name));
        }

        match target {
            NotSlottedCell::Const(c) => Ok(c.value()),
            NotSlottedCell::Input(c) => c.value().ok_or(Error::CellValueMissing(name)),
            NotSlottedCell::Null(_) => Err(Error::CellValueMissing(name)),
            NotSlottedCell::Operation(c) => match c.op_execution_status() {
                OpExecutionStatus::Completed => c.op_value().ok_or(Error::CellValueMissing(name)),
                status => Err(Error::OpNotComplete { cell: name, status }),
            },
        }
    }

    /// Check if [`get_cell_value`](Self::get_cell_value) would return a value
    pub fn has_cell_value(&self, cell: CellHandle) -> bool {
        self.get_cell_value(cell).is_ok()
    }

    fn value_cell(&self, cell: CellHandle) -> Result<&NotSlottedCell> {
        let not_found =
            || Error::invalid_argument(format!("Cell {cell} is not part of the report"));
        if !self.cache.contains(cell) {
            return Err(not_found());
        }
        match self.cache.cell(cell).ok_or_else(not_found)? {
            tally_core::Cell::NotSlotted(c) => Ok(c),
            tally_core::Cell::Slotted(slotted) => slotted
                .default_slot()
                .and_then(|slot| self.cache.not_slotted(slot))
                .ok_or_else(not_found),
        }
    }

    // === Recalculation ===

    /// Recalculate every cell of the report
    ///
    /// `timestamp` must be a UTC time; it stamps every event of the pass.
    /// Local times are rejected even when the host zone is UTC.
    /// `additional` factories are asked before the registered ones.
    pub fn recalc<Tz: TimeZone + 'static>(
        &mut self,
        timestamp: &DateTime<Tz>,
        additional: &[Arc<dyn ProtocolFactory>],
    ) -> RecalcResult<RecalcStats> {
        let timestamp = utc_timestamp(timestamp)?;
        futures::executor::block_on(self.run(timestamp, additional))
    }

    /// Async form of [`recalc`](Self::recalc)
    ///
    /// The timestamp is checked before the future is created; the returned
    /// future is then ready with the error.
    pub fn recalc_async<'s, Tz: TimeZone + 'static>(
        &'s mut self,
        timestamp: &DateTime<Tz>,
        additional: &'s [Arc<dyn ProtocolFactory>],
    ) -> BoxFuture<'s, RecalcResult<RecalcStats>> {
        match utc_timestamp(timestamp) {
            Ok(timestamp) => self.run(timestamp, additional).boxed(),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    async fn run(
        &mut self,
        timestamp: DateTime<Utc>,
        additional: &[Arc<dyn ProtocolFactory>],
    ) -> RecalcResult<RecalcStats> {
        let protocols = additional
            .iter()
            .chain(self.protocols.iter())
            .cloned()
            .collect();
        recalculate(&mut self.cache, &self.options, protocols, timestamp).await
    }
}

impl std::fmt::Debug for ReportAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAgent")
            .field("report", &self.cache.report().id())
            .field("options", &self.options)
            .field("protocols", &self.protocols.len())
            .finish()
    }
}

/// Convert a pass timestamp to UTC, rejecting local times and any other offset
fn utc_timestamp<Tz: TimeZone + 'static>(
    timestamp: &DateTime<Tz>,
) -> RecalcResult<DateTime<Utc>> {
    if TypeId::of::<Tz>() == TypeId::of::<Local>() {
        return Err(RecalcError::InvalidArgument(
            "the recalculation timestamp must be in UTC, got a local time".to_string(),
        ));
    }
    let offset = timestamp.offset().fix().local_minus_utc();
    if offset != 0 {
        return Err(RecalcError::InvalidArgument(format!(
            "the recalculation timestamp must be in UTC, got offset {}",
            timestamp.offset().fix()
        )));
    }
    let timestamp = timestamp.with_timezone(&Utc);
    debug!(%timestamp, "pass timestamp accepted");
    Ok(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tally_core::{
        Column, ConstCell, InputCell, NullCell, Row, Section, SlottedCell, TreeTable, ValueType,
    };

    fn agent() -> (ReportAgent, CellHandle, CellHandle, CellHandle) {
        let mut report = Report::new("r");
        let constant = report.add_cell(ConstCell::new(7i64).with_id("seven"));
        let null = report.add_cell(NullCell::new());
        let viewer = report.add_cell(InputCell::new(ValueType::Text));
        let editor = report.add_cell(ConstCell::new("edit"));
        let slotted = report.add_cell(
            SlottedCell::new("viewer")
                .with_id("role")
                .with_column_span(2)
                .with_slot("viewer", viewer)
                .with_slot("editor", editor),
        );
        report.add_section(Section::new(
            "s",
            TreeTable::new(vec![Column::new("a"), Column::new("b")])
                .with_data_row(Row::with_cells(vec![constant, null]))
                .with_data_row(Row::with_cells(vec![slotted]).with_id("slots"))
                .with_data_row(Row::new()),
        ));
        (ReportAgent::new(report).unwrap(), constant, null, slotted)
    }

    #[test]
    fn test_committed_values() {
        let (agent, constant, null, slotted) = agent();
        assert_eq!(agent.get_cell_value(constant).unwrap(), &Value::Integer(7));
        assert!(matches!(
            agent.get_cell_value(null),
            Err(Error::CellValueMissing(_))
        ));
        // read through the default slot, an unset input
        assert!(matches!(
            agent.get_cell_value(slotted),
            Err(Error::CellValueMissing(_))
        ));
        assert!(!agent.has_cell_value(slotted));
    }

    #[test]
    fn test_rejects_non_utc_timestamp() {
        let (mut agent, ..) = agent();
        let offset = FixedOffset::east_opt(3600).unwrap();
        let timestamp = offset.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(matches!(
            agent.recalc(&timestamp, &[]),
            Err(RecalcError::InvalidArgument(_))
        ));

        assert!(matches!(
            agent.recalc(&Local::now(), &[]),
            Err(RecalcError::InvalidArgument(_))
        ));
        let pending = agent.recalc_async(&Local::now(), &[]);
        assert!(matches!(
            futures::executor::block_on(pending),
            Err(RecalcError::InvalidArgument(_))
        ));

        let utc_offset = FixedOffset::east_opt(0).unwrap();
        let timestamp = utc_offset.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(agent.recalc(&timestamp, &[]).is_ok());
    }
}
