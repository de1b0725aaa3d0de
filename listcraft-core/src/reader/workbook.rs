//! Worksheet data structures

use super::address::cell_ref;

/// Header row number; never rewritten.
pub const HEADER_ROW: u32 = 1;

/// Parsed form of a single worksheet part
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    /// Part name of the sheet XML inside the package (e.g. `xl/worksheets/sheet1.xml`)
    pub path: String,
    /// Rows in sheet order
    pub rows: Vec<Row>,
}

impl Worksheet {
    /// Get a row by its 1-based number
    pub fn row(&self, number: u32) -> Option<&Row> {
        self.rows.iter().find(|r| r.number == number)
    }

    /// Rows that carry data, in sheet order: the header and empty rows are skipped
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(|r| r.number != HEADER_ROW && !r.is_empty())
    }
}

/// Represents a worksheet row
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub number: u32,
    /// Cells in XML order
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            cells: Vec::new(),
        }
    }

    /// Get the cell at a 1-based column
    pub fn cell(&self, column: u32) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column == column)
    }

    /// A row is empty when none of its cells holds a value or a formula
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.content.is_empty())
    }
}

/// Represents a single cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column: u32,
    pub content: CellContent,
}

impl Cell {
    /// A1-style reference of this cell within `row`
    pub fn reference(&self, row: u32) -> String {
        cell_ref(row, self.column)
    }
}

/// What a cell holds
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellContent {
    /// Present in the sheet (usually for styling) but without a value
    #[default]
    Blank,
    /// Literal value as stored: a number, shared string index, boolean or inline text
    Value(String),
    /// Formula text without the leading `=`
    Formula(String),
    /// Follower of a shared formula; the text lives on the master cell
    SharedFormula { index: u32 },
}

impl CellContent {
    /// Check if the cell carries nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Blank)
    }

    /// Get the formula text if this cell owns one
    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellContent::Formula(text) => Some(text),
            _ => None,
        }
    }
}
