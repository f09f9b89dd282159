//! Tree tables
//!
//! A table has a fixed list of columns and three groups of rows. Header
//! and footer rows are flat; data rows form a tree so that rows can be
//! indented under a parent row.

use ahash::AHashSet;

use crate::cell::CellHandle;
use crate::error::{Error, Result, StructuralConflict};

/// A table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub header: Option<String>,
}

impl Column {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            header: None,
        }
    }

    pub fn with_header<S: Into<String>>(mut self, header: S) -> Self {
        self.header = Some(header.into());
        self
    }
}

/// A table row: cells from left to right, plus child rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    id: Option<String>,
    cells: Vec<CellHandle>,
    children: Vec<Row>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cells(cells: Vec<CellHandle>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_cell(mut self, cell: CellHandle) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn with_child(mut self, child: Row) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn cells(&self) -> &[CellHandle] {
        &self.cells
    }

    pub fn children(&self) -> &[Row] {
        &self.children
    }

    /// This row followed by its descendants, parents before children
    fn walk<'a>(&'a self, out: &mut Vec<&'a Row>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Row> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// Columns plus header, data and footer rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeTable {
    columns: Vec<Column>,
    header_rows: Vec<Row>,
    data_rows: Vec<Row>,
    footer_rows: Vec<Row>,
}

impl TreeTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn with_header_row(mut self, row: Row) -> Self {
        self.header_rows.push(row);
        self
    }

    /// Append a top-level data row without checking row ids
    ///
    /// Ids are still checked when the report is indexed.
    pub fn with_data_row(mut self, row: Row) -> Self {
        self.data_rows.push(row);
        self
    }

    pub fn with_footer_row(mut self, row: Row) -> Self {
        self.footer_rows.push(row);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn header_rows(&self) -> &[Row] {
        &self.header_rows
    }

    pub fn data_rows(&self) -> &[Row] {
        &self.data_rows
    }

    pub fn footer_rows(&self) -> &[Row] {
        &self.footer_rows
    }

    /// Every row in display order
    ///
    /// Header rows, then data rows in pre-order, then footer rows.
    pub fn all_rows(&self) -> Vec<&Row> {
        let mut rows = Vec::new();
        for row in self
            .header_rows
            .iter()
            .chain(&self.data_rows)
            .chain(&self.footer_rows)
        {
            row.walk(&mut rows);
        }
        rows
    }

    /// Add a data row, either at the top level or under the row with id `parent`
    ///
    /// Fails if any row id in `row` is already used in this table, or if
    /// `parent` does not name a data row.
    pub fn add_data_row(&mut self, parent: Option<&str>, row: Row) -> Result<()> {
        {
            let mut seen: AHashSet<&str> =
                self.all_rows().into_iter().filter_map(Row::id).collect();
            let mut added = Vec::new();
            row.walk(&mut added);
            for id in added.iter().filter_map(|r| r.id()) {
                if !seen.insert(id) {
                    return Err(Error::structural(
                        "Adding the row would introduce a duplicate row id",
                        StructuralConflict::DuplicateRowId(id.to_string()),
                    ));
                }
            }
        }

        match parent {
            None => self.data_rows.push(row),
            Some(parent) => {
                let target = self
                    .data_rows
                    .iter_mut()
                    .find_map(|r| r.find_mut(parent))
                    .ok_or_else(|| {
                        Error::structural(
                            "Cannot add a row under a parent that is not in the table",
                            StructuralConflict::RowNotFound(parent.to_string()),
                        )
                    })?;
                target.children.push(row);
            }
        }
        Ok(())
    }

    /// Check header/footer flatness, unique row ids, and column spans
    pub(crate) fn check_layout(&self, span_of: impl Fn(CellHandle) -> usize) -> Result<()> {
        if self.header_rows.iter().any(|r| !r.children.is_empty()) {
            return Err(Error::structural(
                "Header rows cannot have child rows",
                StructuralConflict::FlatRowHasChildren("header"),
            ));
        }
        if self.footer_rows.iter().any(|r| !r.children.is_empty()) {
            return Err(Error::structural(
                "Footer rows cannot have child rows",
                StructuralConflict::FlatRowHasChildren("footer"),
            ));
        }

        let mut seen = AHashSet::new();
        for row in self.all_rows() {
            if let Some(id) = row.id() {
                if !seen.insert(id) {
                    return Err(Error::structural(
                        "Row ids must be unique within a table",
                        StructuralConflict::DuplicateRowId(id.to_string()),
                    ));
                }
            }
            // rows without cells only group their children
            if row.cells.is_empty() {
                continue;
            }
            let span: usize = row.cells.iter().map(|&cell| span_of(cell)).sum();
            if span != self.columns.len() {
                return Err(Error::structural(
                    "Row cells do not cover the table's columns",
                    StructuralConflict::ColumnSpanMismatch {
                        expected: self.columns.len(),
                        actual: span,
                    },
                ));
            }
        }
        Ok(())
    }
}
