//! Report index
//!
//! [`ReportCache`] takes ownership of a [`Report`], checks its structure,
//! and precomputes the lookups used during evaluation: cell id to cell per
//! section and report-wide, cell to section, and the capability-filtered
//! cell views the recalculation engine walks.
//!
//! The index is built once. Cell specifications are immutable afterwards;
//! the only mutations the cache allows are appending events to cell logs.

use ahash::AHashMap;
use chrono::{DateTime, Utc};

use crate::cell::{
    Cell, CellCapability, CellHandle, HasAvailabilityCheck, HasOperationOutput, HasValidation,
    NotSlottedCell,
};
use crate::error::{CellNotFoundError, Error, NotFoundReason, Result, StructuralConflict};
use crate::event::{AvailabilityCheckOutcome, Event, OpExecutionOutcome, ValidationOutcome};
use crate::locator::{
    CellLocator, ReportWideLocator, SectionCellLocator, SlotSelectionStrategy,
};
use crate::report::{Report, Section};
use crate::value::Value;

/// Where a cell sits in the report tree
#[derive(Debug, Clone, Copy)]
struct Placement {
    section: usize,
    /// The slotted cell this cell is a slot of
    slot_of: Option<CellHandle>,
}

/// Indexed, structurally checked report
#[derive(Debug)]
pub struct ReportCache {
    report: Report,
    /// Per arena index; `None` for cells not in the tree
    placement: Vec<Option<Placement>>,
    section_by_id: AHashMap<String, usize>,
    /// Per section: cell id to top-level cells with that id
    by_section: Vec<AHashMap<String, Vec<CellHandle>>>,
    /// Report-wide: cell id to top-level cells with that id
    by_id: AHashMap<String, Vec<CellHandle>>,
    all_cells: Vec<CellHandle>,
    const_cells: Vec<CellHandle>,
    input_cells: Vec<CellHandle>,
    operation_cells: Vec<CellHandle>,
    validation_cells: Vec<CellHandle>,
    availability_check_cells: Vec<CellHandle>,
}

impl ReportCache {
    /// Index `report`, failing with a structural error if it is malformed
    pub fn new(report: Report) -> Result<Self> {
        let mut placement = vec![None; report.cell_count()];
        let mut section_by_id = AHashMap::new();
        let mut by_section = Vec::with_capacity(report.sections().len());
        let mut by_id: AHashMap<String, Vec<CellHandle>> = AHashMap::new();
        let mut all_cells = Vec::new();

        for (index, section) in report.sections().iter().enumerate() {
            if section_by_id
                .insert(section.id().to_string(), index)
                .is_some()
            {
                return Err(Error::structural(
                    "Section ids must be unique within a report",
                    StructuralConflict::DuplicateSectionId(section.id().to_string()),
                ));
            }

            let mut ids: AHashMap<String, Vec<CellHandle>> = AHashMap::new();
            for row in section.table().all_rows() {
                for &handle in row.cells() {
                    let cell = place(&report, &mut placement, handle, index, None)?;
                    all_cells.push(handle);

                    if let Some(id) = cell.id() {
                        ids.entry(id.to_string()).or_default().push(handle);
                        by_id.entry(id.to_string()).or_default().push(handle);
                    }

                    if let Cell::Slotted(slotted) = cell {
                        if slotted.default_slot().is_none() {
                            return Err(Error::structural(
                                "A slotted cell's default slot must be one of its slots",
                                StructuralConflict::MissingDefaultSlot {
                                    cell: handle,
                                    slot_id: slotted.default_slot_id().to_string(),
                                },
                            ));
                        }
                        for (slot_id, slot) in slotted.slots() {
                            let slot_cell =
                                place(&report, &mut placement, slot, index, Some(handle))?;
                            if let Cell::Slotted(_) = slot_cell {
                                return Err(Error::structural(
                                    "Slots must hold not-slotted cells",
                                    StructuralConflict::NestedSlottedCell {
                                        cell: handle,
                                        slot_id: slot_id.to_string(),
                                    },
                                ));
                            }
                            all_cells.push(slot);
                        }
                    }
                }
            }

            section
                .table()
                .check_layout(|h| report.cell(h).map(Cell::column_span).unwrap_or(0))?;
            by_section.push(ids);
        }

        let mut cache = Self {
            report,
            placement,
            section_by_id,
            by_section,
            by_id,
            all_cells,
            const_cells: Vec::new(),
            input_cells: Vec::new(),
            operation_cells: Vec::new(),
            validation_cells: Vec::new(),
            availability_check_cells: Vec::new(),
        };
        cache.build_views();
        Ok(cache)
    }

    fn build_views(&mut self) {
        for &handle in &self.all_cells {
            let Some(cell) = self.report.cell(handle).and_then(Cell::as_not_slotted) else {
                continue;
            };
            match cell {
                NotSlottedCell::Const(_) => self.const_cells.push(handle),
                NotSlottedCell::Input(_) => self.input_cells.push(handle),
                NotSlottedCell::Operation(_) => self.operation_cells.push(handle),
                NotSlottedCell::Null(_) => {}
            }
            if cell.validation().is_some() {
                self.validation_cells.push(handle);
            }
            if cell.availability_check().is_some() {
                self.availability_check_cells.push(handle);
            }
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    // === Views ===

    /// Every cell in the tree, slots directly after their slotted cell
    pub fn all_cells(&self) -> &[CellHandle] {
        &self.all_cells
    }

    pub fn const_cells(&self) -> &[CellHandle] {
        &self.const_cells
    }

    pub fn input_cells(&self) -> &[CellHandle] {
        &self.input_cells
    }

    pub fn operation_cells(&self) -> &[CellHandle] {
        &self.operation_cells
    }

    pub fn validation_cells(&self) -> &[CellHandle] {
        &self.validation_cells
    }

    pub fn availability_check_cells(&self) -> &[CellHandle] {
        &self.availability_check_cells
    }

    // === Cell access ===

    /// Check if the cell is part of the report tree
    pub fn contains(&self, handle: CellHandle) -> bool {
        matches!(self.placement.get(handle.0), Some(Some(_)))
    }

    pub fn cell(&self, handle: CellHandle) -> Option<&Cell> {
        self.report.cell(handle)
    }

    pub fn not_slotted(&self, handle: CellHandle) -> Option<&NotSlottedCell> {
        self.report.cell(handle).and_then(Cell::as_not_slotted)
    }

    /// The section containing the cell
    pub fn get_section(&self, handle: CellHandle) -> Result<&Section> {
        self.section_index(handle)
            .and_then(|index| self.report.sections().get(index))
            .ok_or_else(|| {
                Error::invalid_argument(format!("Cell {handle} is not part of the report"))
            })
    }

    fn section_index(&self, handle: CellHandle) -> Option<usize> {
        self.placement
            .get(handle.0)
            .copied()
            .flatten()
            .map(|p| p.section)
    }

    /// Human-readable name of a cell for messages
    ///
    /// The cell's id if it has one, `parent[slot]` for an unnamed slot, and
    /// the handle otherwise.
    pub fn describe(&self, handle: CellHandle) -> String {
        if let Some(id) = self.report.cell(handle).and_then(Cell::id) {
            return id.to_string();
        }
        let parent = self
            .placement
            .get(handle.0)
            .copied()
            .flatten()
            .and_then(|p| p.slot_of);
        if let Some(parent) = parent {
            if let Some(Cell::Slotted(slotted)) = self.report.cell(parent) {
                if let Some((slot_id, _)) = slotted.slots().find(|(_, h)| *h == handle) {
                    return format!("{}[{}]", self.describe(parent), slot_id);
                }
            }
        }
        handle.to_string()
    }

    // === Lookup ===

    /// Resolve a report-wide locator
    pub fn get_cell<L: ReportWideLocator + ?Sized>(
        &self,
        locator: &L,
    ) -> std::result::Result<CellHandle, CellNotFoundError> {
        let not_found = |reason| CellNotFoundError::new(locator.to_cell_locator(), reason);
        let scope = match locator.section_id() {
            Some(section_id) => Some(*self.section_by_id.get(section_id).ok_or_else(|| {
                not_found(NotFoundReason::SectionNotFound(section_id.to_string()))
            })?),
            None => None,
        };
        self.find(scope, locator.cell_id(), locator.slot_id(), locator.strategy())
            .map_err(not_found)
    }

    pub fn try_get_cell<L: ReportWideLocator + ?Sized>(&self, locator: &L) -> Option<CellHandle> {
        self.get_cell(locator).ok()
    }

    /// Resolve a report-wide locator to a cell with the given capability
    pub fn get_cell_with<L: ReportWideLocator + ?Sized>(
        &self,
        locator: &L,
        capability: CellCapability,
    ) -> std::result::Result<CellHandle, CellNotFoundError> {
        let handle = self.get_cell(locator)?;
        self.check_capability(handle, capability)
            .map_err(|reason| CellNotFoundError::new(locator.to_cell_locator(), reason))?;
        Ok(handle)
    }

    pub fn try_get_cell_with<L: ReportWideLocator + ?Sized>(
        &self,
        locator: &L,
        capability: CellCapability,
    ) -> Option<CellHandle> {
        self.get_cell_with(locator, capability).ok()
    }

    /// Resolve a locator within the section containing `current`
    pub fn get_cell_in_section(
        &self,
        locator: &SectionCellLocator,
        current: CellHandle,
    ) -> Result<CellHandle> {
        let section = self
            .section_index(current)
            .ok_or(Error::CurrentCellNotInReport(current))?;
        self.find(
            Some(section),
            &locator.cell_id,
            locator.slot_id.as_deref(),
            locator.strategy,
        )
        .map_err(|reason| {
            CellNotFoundError::new(CellLocator::Section(locator.clone()), reason).into()
        })
    }

    /// Like [`get_cell_in_section`](Self::get_cell_in_section), with not-found
    /// mapped to `None`
    pub fn try_get_cell_in_section(
        &self,
        locator: &SectionCellLocator,
        current: CellHandle,
    ) -> Result<Option<CellHandle>> {
        match self.get_cell_in_section(locator, current) {
            Ok(handle) => Ok(Some(handle)),
            Err(Error::CellNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve a section-relative locator against a fixed section
    pub fn get_cell_in_named_section(
        &self,
        locator: &SectionCellLocator,
        section_id: &str,
    ) -> std::result::Result<CellHandle, CellNotFoundError> {
        self.get_cell(&locator.in_section(section_id))
    }

    /// Resolve any locator on behalf of `current`
    pub fn resolve(&self, locator: &CellLocator, current: CellHandle) -> Result<CellHandle> {
        match locator {
            CellLocator::ThisCell if self.contains(current) => Ok(current),
            CellLocator::ThisCell => Err(Error::CurrentCellNotInReport(current)),
            CellLocator::Section(l) => self.get_cell_in_section(l, current),
            CellLocator::InReport(l) => Ok(self.get_cell(l)?),
            CellLocator::Standard(l) => Ok(self.get_cell(l)?),
        }
    }

    /// Resolve any locator on behalf of `current`, requiring a capability
    pub fn resolve_with(
        &self,
        locator: &CellLocator,
        current: CellHandle,
        capability: CellCapability,
    ) -> Result<CellHandle> {
        let handle = self.resolve(locator, current)?;
        self.check_capability(handle, capability)
            .map_err(|reason| CellNotFoundError::new(locator.clone(), reason))?;
        Ok(handle)
    }

    fn find(
        &self,
        scope: Option<usize>,
        cell_id: &str,
        slot_id: Option<&str>,
        strategy: SlotSelectionStrategy,
    ) -> std::result::Result<CellHandle, NotFoundReason> {
        let candidates = match scope {
            Some(section) => self.by_section.get(section).and_then(|ids| ids.get(cell_id)),
            None => self.by_id.get(cell_id),
        };
        let handle = match candidates.map(Vec::as_slice).unwrap_or_default() {
            [handle] => *handle,
            [] => return Err(NotFoundReason::NoMatchingCell(cell_id.to_string())),
            many => {
                return Err(NotFoundReason::AmbiguousCellId {
                    cell_id: cell_id.to_string(),
                    count: many.len(),
                })
            }
        };

        match (self.report.cell(handle), slot_id) {
            (Some(Cell::Slotted(slotted)), Some(slot_id)) => slotted
                .slot(slot_id)
                .ok_or_else(|| NotFoundReason::SlotNotFound(slot_id.to_string())),
            (Some(Cell::Slotted(slotted)), None) => match strategy {
                SlotSelectionStrategy::DefaultSlot => slotted.default_slot().ok_or_else(|| {
                    NotFoundReason::SlotNotFound(slotted.default_slot_id().to_string())
                }),
                SlotSelectionStrategy::ThrowIfSlotIdNotSpecified => {
                    Err(NotFoundReason::SlotIdNotSpecified)
                }
            },
            (_, Some(_)) => Err(NotFoundReason::NotSlotted),
            (_, None) => Ok(handle),
        }
    }

    fn check_capability(
        &self,
        handle: CellHandle,
        capability: CellCapability,
    ) -> std::result::Result<(), NotFoundReason> {
        match self.report.cell(handle) {
            Some(Cell::NotSlotted(cell)) if cell.has_capability(capability) => Ok(()),
            Some(cell) => Err(NotFoundReason::CapabilityMismatch {
                expected: capability,
                actual: cell.kind_name(),
            }),
            None => Err(NotFoundReason::NoMatchingCell(handle.to_string())),
        }
    }

    // === Event log mutators ===

    fn not_slotted_mut(&mut self, handle: CellHandle) -> Result<&mut NotSlottedCell> {
        if !self.contains(handle) {
            return Err(Error::invalid_argument(format!(
                "Cell {handle} is not part of the report"
            )));
        }
        let name = self.describe(handle);
        self.report
            .cell_mut(handle)
            .and_then(Cell::as_not_slotted_mut)
            .ok_or_else(|| Error::invalid_operation(format!("Cell {name} is a slotted cell")))
    }

    pub fn set_input_value(
        &mut self,
        handle: CellHandle,
        timestamp: DateTime<Utc>,
        value: Value,
    ) -> Result<()> {
        let name = self.describe(handle);
        self.not_slotted_mut(handle)?
            .as_input_mut()
            .ok_or_else(|| Error::invalid_operation(format!("Cell {name} is not an input cell")))?
            .set_value(timestamp, value)
    }

    pub fn clear_input_value(
        &mut self,
        handle: CellHandle,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        let name = self.describe(handle);
        self.not_slotted_mut(handle)?
            .as_input_mut()
            .ok_or_else(|| Error::invalid_operation(format!("Cell {name} is not an input cell")))?
            .clear_value(timestamp, details);
        Ok(())
    }

    pub fn record_op_execution(
        &mut self,
        handle: CellHandle,
        event: Event<OpExecutionOutcome>,
    ) -> Result<()> {
        let name = self.describe(handle);
        self.not_slotted_mut(handle)?
            .as_operation_mut()
            .ok_or_else(|| {
                Error::invalid_operation(format!("Cell {name} is not an operation cell"))
            })?
            .record_op_execution(event);
        Ok(())
    }

    pub fn clear_op_execution(
        &mut self,
        handle: CellHandle,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        let name = self.describe(handle);
        self.not_slotted_mut(handle)?
            .as_operation_mut()
            .ok_or_else(|| {
                Error::invalid_operation(format!("Cell {name} is not an operation cell"))
            })?
            .clear_op_execution(timestamp, details);
        Ok(())
    }

    pub fn record_validation(
        &mut self,
        handle: CellHandle,
        event: Event<ValidationOutcome>,
    ) -> Result<()> {
        self.not_slotted_mut(handle)?.record_validation(event)
    }

    pub fn clear_validation(
        &mut self,
        handle: CellHandle,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        self.not_slotted_mut(handle)?
            .clear_validation(timestamp, details)
    }

    pub fn record_availability_check(
        &mut self,
        handle: CellHandle,
        event: Event<AvailabilityCheckOutcome>,
    ) -> Result<()> {
        self.not_slotted_mut(handle)?
            .record_availability_check(event)
    }

    pub fn clear_availability_check(
        &mut self,
        handle: CellHandle,
        timestamp: DateTime<Utc>,
        details: Option<&str>,
    ) -> Result<()> {
        self.not_slotted_mut(handle)?
            .clear_availability_check(timestamp, details)
    }
}

/// Mark `handle` as placed in the tree and return its cell
fn place<'r>(
    report: &'r Report,
    placement: &mut [Option<Placement>],
    handle: CellHandle,
    section: usize,
    slot_of: Option<CellHandle>,
) -> Result<&'r Cell> {
    let cell = report.cell(handle).ok_or_else(|| {
        Error::structural(
            "The report refers to a cell it does not contain",
            StructuralConflict::UnknownCell(handle),
        )
    })?;
    match placement.get_mut(handle.0) {
        Some(slot @ None) => {
            *slot = Some(Placement { section, slot_of });
            Ok(cell)
        }
        _ => Err(Error::structural(
            "One or more cell objects are used multiple times in the report",
            StructuralConflict::DuplicateCell(handle),
        )),
    }
}
