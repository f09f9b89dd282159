//! Cell locators
//!
//! A locator describes how to find a cell: by a report-wide unique id, by
//! an id inside a named section, by an id inside the section of the cell
//! doing the lookup, or simply "the current cell". Locators that reach a
//! slotted cell pick one of its slots, either explicitly by slot id or
//! according to a [`SlotSelectionStrategy`].

use std::fmt;

/// What to do when a locator without a slot id reaches a slotted cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotSelectionStrategy {
    /// Use the slotted cell's default slot
    #[default]
    DefaultSlot,
    /// Fail unless a slot id was given
    ThrowIfSlotIdNotSpecified,
}

/// Locates a cell whose id is unique across the whole report
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StandardCellLocator {
    pub cell_id: String,
    pub slot_id: Option<String>,
    pub strategy: SlotSelectionStrategy,
}

/// Locates a cell whose id is unique within a named section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InReportCellLocator {
    pub section_id: String,
    pub cell_id: String,
    pub slot_id: Option<String>,
    pub strategy: SlotSelectionStrategy,
}

/// Locates a cell within the section of the cell performing the lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionCellLocator {
    pub cell_id: String,
    pub slot_id: Option<String>,
    pub strategy: SlotSelectionStrategy,
}

macro_rules! slot_builders {
    ($ty:ty) => {
        impl $ty {
            /// Address a specific slot of a slotted cell
            pub fn with_slot<S: Into<String>>(mut self, slot_id: S) -> Self {
                self.slot_id = Some(slot_id.into());
                self
            }

            pub fn with_strategy(mut self, strategy: SlotSelectionStrategy) -> Self {
                self.strategy = strategy;
                self
            }
        }
    };
}

impl StandardCellLocator {
    pub fn new<S: Into<String>>(cell_id: S) -> Self {
        Self {
            cell_id: cell_id.into(),
            slot_id: None,
            strategy: SlotSelectionStrategy::default(),
        }
    }
}

impl InReportCellLocator {
    pub fn new<S: Into<String>, C: Into<String>>(section_id: S, cell_id: C) -> Self {
        Self {
            section_id: section_id.into(),
            cell_id: cell_id.into(),
            slot_id: None,
            strategy: SlotSelectionStrategy::default(),
        }
    }
}

impl SectionCellLocator {
    pub fn new<S: Into<String>>(cell_id: S) -> Self {
        Self {
            cell_id: cell_id.into(),
            slot_id: None,
            strategy: SlotSelectionStrategy::default(),
        }
    }

    /// Pin this locator to a named section
    pub fn in_section<S: Into<String>>(&self, section_id: S) -> InReportCellLocator {
        InReportCellLocator {
            section_id: section_id.into(),
            cell_id: self.cell_id.clone(),
            slot_id: self.slot_id.clone(),
            strategy: self.strategy,
        }
    }
}

slot_builders!(StandardCellLocator);
slot_builders!(InReportCellLocator);
slot_builders!(SectionCellLocator);

/// Any locator an op can carry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellLocator {
    /// The cell that owns the op being evaluated
    ThisCell,
    Section(SectionCellLocator),
    InReport(InReportCellLocator),
    Standard(StandardCellLocator),
}

impl CellLocator {
    pub fn this() -> Self {
        CellLocator::ThisCell
    }

    /// A cell in the same section as the current cell
    pub fn section<S: Into<String>>(cell_id: S) -> Self {
        CellLocator::Section(SectionCellLocator::new(cell_id))
    }

    pub fn in_report<S: Into<String>, C: Into<String>>(section_id: S, cell_id: C) -> Self {
        CellLocator::InReport(InReportCellLocator::new(section_id, cell_id))
    }

    pub fn standard<S: Into<String>>(cell_id: S) -> Self {
        CellLocator::Standard(StandardCellLocator::new(cell_id))
    }
}

impl From<SectionCellLocator> for CellLocator {
    fn from(locator: SectionCellLocator) -> Self {
        CellLocator::Section(locator)
    }
}

impl From<InReportCellLocator> for CellLocator {
    fn from(locator: InReportCellLocator) -> Self {
        CellLocator::InReport(locator)
    }
}

impl From<StandardCellLocator> for CellLocator {
    fn from(locator: StandardCellLocator) -> Self {
        CellLocator::Standard(locator)
    }
}

/// A locator that can be resolved without knowing the current cell
pub trait ReportWideLocator {
    /// The section the id is unique within, or `None` for the whole report
    fn section_id(&self) -> Option<&str>;
    fn cell_id(&self) -> &str;
    fn slot_id(&self) -> Option<&str>;
    fn strategy(&self) -> SlotSelectionStrategy;
    /// The locator as carried in errors
    fn to_cell_locator(&self) -> CellLocator;
}

impl ReportWideLocator for StandardCellLocator {
    fn section_id(&self) -> Option<&str> {
        None
    }

    fn cell_id(&self) -> &str {
        &self.cell_id
    }

    fn slot_id(&self) -> Option<&str> {
        self.slot_id.as_deref()
    }

    fn strategy(&self) -> SlotSelectionStrategy {
        self.strategy
    }

    fn to_cell_locator(&self) -> CellLocator {
        CellLocator::Standard(self.clone())
    }
}

impl ReportWideLocator for InReportCellLocator {
    fn section_id(&self) -> Option<&str> {
        Some(&self.section_id)
    }

    fn cell_id(&self) -> &str {
        &self.cell_id
    }

    fn slot_id(&self) -> Option<&str> {
        self.slot_id.as_deref()
    }

    fn strategy(&self) -> SlotSelectionStrategy {
        self.strategy
    }

    fn to_cell_locator(&self) -> CellLocator {
        CellLocator::InReport(self.clone())
    }
}

fn write_slot(f: &mut fmt::Formatter<'_>, slot_id: Option<&str>) -> fmt::Result {
    match slot_id {
        Some(slot) => write!(f, "[{slot}]"),
        None => Ok(()),
    }
}

impl fmt::Display for CellLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellLocator::ThisCell => f.write_str("this cell"),
            CellLocator::Section(l) => {
                write!(f, "'{}'", l.cell_id)?;
                write_slot(f, l.slot_id.as_deref())?;
                f.write_str(" in the current section")
            }
            CellLocator::InReport(l) => {
                write!(f, "'{}'", l.cell_id)?;
                write_slot(f, l.slot_id.as_deref())?;
                write!(f, " in section '{}'", l.section_id)
            }
            CellLocator::Standard(l) => {
                write!(f, "'{}'", l.cell_id)?;
                write_slot(f, l.slot_id.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CellLocator::this().to_string(), "this cell");
        assert_eq!(
            CellLocator::Standard(StandardCellLocator::new("total").with_slot("admin")).to_string(),
            "'total'[admin]"
        );
        assert_eq!(
            CellLocator::in_report("fte", "total").to_string(),
            "'total' in section 'fte'"
        );
        assert_eq!(
            CellLocator::section("total").to_string(),
            "'total' in the current section"
        );
    }

    #[test]
    fn test_section_locator_pinned_to_section() {
        let locator = SectionCellLocator::new("total")
            .with_slot("admin")
            .with_strategy(SlotSelectionStrategy::ThrowIfSlotIdNotSpecified);
        let pinned = locator.in_section("fte");

        assert_eq!(pinned.section_id(), Some("fte"));
        assert_eq!(pinned.cell_id(), "total");
        assert_eq!(pinned.slot_id(), Some("admin"));
        assert_eq!(
            pinned.strategy(),
            SlotSelectionStrategy::ThrowIfSlotIdNotSpecified
        );
    }
}
