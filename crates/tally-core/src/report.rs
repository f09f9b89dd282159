//! Reports and sections

use crate::cell::{Cell, CellHandle};
use crate::table::TreeTable;

/// A named section holding one tree table
#[derive(Debug, Clone)]
pub struct Section {
    id: String,
    title: Option<String>,
    table: TreeTable,
}

impl Section {
    pub fn new<S: Into<String>>(id: S, table: TreeTable) -> Self {
        Self {
            id: id.into(),
            title: None,
            table,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn table(&self) -> &TreeTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TreeTable {
        &mut self.table
    }
}

/// A report: ordered sections plus the arena owning every cell
///
/// Rows refer to cells by [`CellHandle`]. Handles are only meaningful for
/// the report that issued them.
#[derive(Debug, Clone)]
pub struct Report {
    id: String,
    title: Option<String>,
    sections: Vec<Section>,
    cells: Vec<Cell>,
}

impl Report {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            title: None,
            sections: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Store a cell in the arena and return its handle
    ///
    /// The cell is not part of the report tree until a row refers to it.
    pub fn add_cell<C: Into<Cell>>(&mut self, cell: C) -> CellHandle {
        self.cells.push(cell.into());
        CellHandle(self.cells.len() - 1)
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    pub fn cell(&self, handle: CellHandle) -> Option<&Cell> {
        self.cells.get(handle.0)
    }

    pub(crate) fn cell_mut(&mut self, handle: CellHandle) -> Option<&mut Cell> {
        self.cells.get_mut(handle.0)
    }

    /// Number of cells in the arena
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
