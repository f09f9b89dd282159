//! Cells
//!
//! Cells live in the report's arena and are referenced everywhere else by
//! [`CellHandle`]. A handle may appear only once in the report tree, which
//! is checked when the report is indexed.

mod capability;
mod kinds;

pub use capability::{
    AvailabilityCheck, HasAvailabilityCheck, HasOperationOutput, HasValidation, Validation,
};
pub use kinds::{CellBase, ConstCell, InputCell, NullCell, OperationCell};

use std::fmt;

/// Index of a cell in its report's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellHandle(pub(crate) usize);

impl CellHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a typed lookup requires of the resolved cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellCapability {
    Const,
    Input,
    Operation,
    Null,
    Validation,
    AvailabilityCheck,
}

impl fmt::Display for CellCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellCapability::Const => "const values",
            CellCapability::Input => "inputs",
            CellCapability::Operation => "operations",
            CellCapability::Null => "null placeholders",
            CellCapability::Validation => "validation",
            CellCapability::AvailabilityCheck => "availability checks",
        })
    }
}

/// A cell holding at most one logical value
#[derive(Debug, Clone)]
pub enum NotSlottedCell {
    Const(ConstCell),
    Input(InputCell),
    Operation(OperationCell),
    Null(NullCell),
}

impl NotSlottedCell {
    pub fn base(&self) -> &CellBase {
        match self {
            NotSlottedCell::Const(c) => c.base(),
            NotSlottedCell::Input(c) => c.base(),
            NotSlottedCell::Operation(c) => c.base(),
            NotSlottedCell::Null(c) => c.base(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    /// Runtime kind, as reported in lookup errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            NotSlottedCell::Const(_) => "const",
            NotSlottedCell::Input(_) => "input",
            NotSlottedCell::Operation(_) => "operation",
            NotSlottedCell::Null(_) => "null",
        }
    }

    pub fn has_capability(&self, capability: CellCapability) -> bool {
        match capability {
            CellCapability::Const => matches!(self, NotSlottedCell::Const(_)),
            CellCapability::Input => matches!(self, NotSlottedCell::Input(_)),
            CellCapability::Operation => matches!(self, NotSlottedCell::Operation(_)),
            CellCapability::Null => matches!(self, NotSlottedCell::Null(_)),
            CellCapability::Validation => self.validation().is_some(),
            CellCapability::AvailabilityCheck => self.availability_check().is_some(),
        }
    }

    pub fn as_input(&self) -> Option<&InputCell> {
        match self {
            NotSlottedCell::Input(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_input_mut(&mut self) -> Option<&mut InputCell> {
        match self {
            NotSlottedCell::Input(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&OperationCell> {
        match self {
            NotSlottedCell::Operation(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_operation_mut(&mut self) -> Option<&mut OperationCell> {
        match self {
            NotSlottedCell::Operation(c) => Some(c),
            _ => None,
        }
    }
}

impl HasValidation for NotSlottedCell {
    fn validation(&self) -> Option<&Validation> {
        match self {
            NotSlottedCell::Const(c) => c.validation(),
            NotSlottedCell::Input(c) => c.validation(),
            NotSlottedCell::Operation(c) => c.validation(),
            NotSlottedCell::Null(c) => c.validation(),
        }
    }

    fn validation_mut(&mut self) -> Option<&mut Validation> {
        match self {
            NotSlottedCell::Const(c) => c.validation_mut(),
            NotSlottedCell::Input(c) => c.validation_mut(),
            NotSlottedCell::Operation(c) => c.validation_mut(),
            NotSlottedCell::Null(c) => c.validation_mut(),
        }
    }
}

impl HasAvailabilityCheck for NotSlottedCell {
    fn availability_check(&self) -> Option<&AvailabilityCheck> {
        match self {
            NotSlottedCell::Const(c) => c.availability_check(),
            NotSlottedCell::Input(c) => c.availability_check(),
            NotSlottedCell::Operation(c) => c.availability_check(),
            NotSlottedCell::Null(c) => c.availability_check(),
        }
    }

    fn availability_check_mut(&mut self) -> Option<&mut AvailabilityCheck> {
        match self {
            NotSlottedCell::Const(c) => c.availability_check_mut(),
            NotSlottedCell::Input(c) => c.availability_check_mut(),
            NotSlottedCell::Operation(c) => c.availability_check_mut(),
            NotSlottedCell::Null(c) => c.availability_check_mut(),
        }
    }
}

/// A cell presenting one of several alternative not-slotted cells
#[derive(Debug, Clone)]
pub struct SlottedCell {
    id: Option<String>,
    column_span: usize,
    slots: Vec<(String, CellHandle)>,
    default_slot_id: String,
}

impl SlottedCell {
    pub fn new<S: Into<String>>(default_slot_id: S) -> Self {
        Self {
            id: None,
            column_span: 1,
            slots: Vec::new(),
            default_slot_id: default_slot_id.into(),
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_column_span(mut self, span: usize) -> Self {
        self.column_span = span.max(1);
        self
    }

    /// Add a slot; a later slot with the same id replaces the earlier one
    pub fn with_slot<S: Into<String>>(mut self, slot_id: S, cell: CellHandle) -> Self {
        let slot_id = slot_id.into();
        match self.slots.iter_mut().find(|(id, _)| *id == slot_id) {
            Some(slot) => slot.1 = cell,
            None => self.slots.push((slot_id, cell)),
        }
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn default_slot_id(&self) -> &str {
        &self.default_slot_id
    }

    pub fn slot(&self, slot_id: &str) -> Option<CellHandle> {
        self.slots
            .iter()
            .find(|(id, _)| id == slot_id)
            .map(|(_, cell)| *cell)
    }

    pub fn default_slot(&self) -> Option<CellHandle> {
        self.slot(&self.default_slot_id)
    }

    /// Slots in insertion order
    pub fn slots(&self) -> impl Iterator<Item = (&str, CellHandle)> {
        self.slots.iter().map(|(id, cell)| (id.as_str(), *cell))
    }
}

/// Any cell stored in a report
#[derive(Debug, Clone)]
pub enum Cell {
    NotSlotted(NotSlottedCell),
    Slotted(SlottedCell),
}

impl Cell {
    pub fn id(&self) -> Option<&str> {
        match self {
            Cell::NotSlotted(c) => c.id(),
            Cell::Slotted(c) => c.id(),
        }
    }

    pub fn column_span(&self) -> usize {
        match self {
            Cell::NotSlotted(c) => c.base().column_span,
            Cell::Slotted(c) => c.column_span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Cell::NotSlotted(c) => c.kind_name(),
            Cell::Slotted(_) => "slotted",
        }
    }

    pub fn as_not_slotted(&self) -> Option<&NotSlottedCell> {
        match self {
            Cell::NotSlotted(c) => Some(c),
            Cell::Slotted(_) => None,
        }
    }

    pub fn as_not_slotted_mut(&mut self) -> Option<&mut NotSlottedCell> {
        match self {
            Cell::NotSlotted(c) => Some(c),
            Cell::Slotted(_) => None,
        }
    }
}

impl From<ConstCell> for Cell {
    fn from(cell: ConstCell) -> Self {
        Cell::NotSlotted(NotSlottedCell::Const(cell))
    }
}

impl From<InputCell> for Cell {
    fn from(cell: InputCell) -> Self {
        Cell::NotSlotted(NotSlottedCell::Input(cell))
    }
}

impl From<OperationCell> for Cell {
    fn from(cell: OperationCell) -> Self {
        Cell::NotSlotted(NotSlottedCell::Operation(cell))
    }
}

impl From<NullCell> for Cell {
    fn from(cell: NullCell) -> Self {
        Cell::NotSlotted(NotSlottedCell::Null(cell))
    }
}

impl From<SlottedCell> for Cell {
    fn from(cell: SlottedCell) -> Self {
        Cell::Slotted(cell)
    }
}
