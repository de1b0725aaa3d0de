//! Rewrite planning: decide every cell edit from the parsed worksheet before any XML is written

use crate::reader::address::{COLUMN_A, COLUMN_B, COLUMN_C};
use crate::reader::workbook::{CellContent, Worksheet};
use std::collections::BTreeMap;

/// How a template is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteMode {
    /// Rewrite formulas in columns A and B and stamp the brand name into column C
    ListingTemplate { brand_name: String },
    /// Rewrite formulas in columns A and B only
    StockUpdate,
}

impl RewriteMode {
    pub fn name(&self) -> &'static str {
        match self {
            RewriteMode::ListingTemplate { .. } => "listing-template",
            RewriteMode::StockUpdate => "stock-update",
        }
    }

    fn brand_name(&self) -> Option<&str> {
        match self {
            RewriteMode::ListingTemplate { brand_name } => Some(brand_name),
            RewriteMode::StockUpdate => None,
        }
    }
}

/// Quoted sentinel to quoted token substitution applied to formula text
#[derive(Debug, Clone)]
pub struct Substitution {
    from: String,
    to: String,
}

impl Substitution {
    pub fn new(sentinel: &str, token: &str) -> Self {
        Self {
            from: quote_literal(sentinel),
            to: quote_literal(&xml_safe(token)),
        }
    }

    /// Replace the first occurrence of the quoted sentinel.
    /// Returns `None` when the formula does not contain it.
    pub fn apply(&self, formula: &str) -> Option<String> {
        if formula.contains(&self.from) {
            Some(formula.replacen(&self.from, &self.to, 1))
        } else {
            None
        }
    }
}

/// Drop characters XML 1.0 cannot carry (C0 controls other than tab, LF, CR,
/// and the U+FFFE/U+FFFF noncharacters)
pub fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
            )
        })
        .collect()
}

/// Formula string literal: wrapped in quotes, embedded quotes doubled
fn quote_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// A single planned cell modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    /// Replace the formula text, keeping the cell formula-typed
    ReplaceFormula(String),
    /// Overwrite the cell with a literal string; `insert` when the row has no such cell yet
    WriteText { value: String, insert: bool },
}

/// Edits planned for one row, keyed by 1-based column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEdits {
    pub cells: BTreeMap<u32, CellEdit>,
}

impl RowEdits {
    pub fn get(&self, column: u32) -> Option<&CellEdit> {
        self.cells.get(&column)
    }

    /// Columns whose cell must be created, ascending
    pub fn inserted_columns(&self) -> impl Iterator<Item = (u32, &str)> {
        self.cells.iter().filter_map(|(column, edit)| match edit {
            CellEdit::WriteText {
                value,
                insert: true,
            } => Some((*column, value.as_str())),
            _ => None,
        })
    }
}

/// All edits for a worksheet, keyed by 1-based row number
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    rows: BTreeMap<u32, RowEdits>,
    /// Formula cells replaced by literal text
    overwritten_formulas: usize,
}

impl RewritePlan {
    /// Walk the data rows of `sheet` and collect edits for `mode`
    pub fn build(sheet: &Worksheet, mode: &RewriteMode, substitution: &Substitution) -> Self {
        let mut rows = BTreeMap::new();
        let mut overwritten_formulas = 0;
        let brand_name = mode.brand_name().map(xml_safe);

        for row in sheet.data_rows() {
            let mut edits = RowEdits::default();

            for column in [COLUMN_A, COLUMN_B] {
                let rewritten = row
                    .cell(column)
                    .and_then(|cell| cell.content.as_formula())
                    .and_then(|formula| {
                        // Same token as the sentinel: nothing to change
                        substitution.apply(formula).filter(|new| new != formula)
                    });
                if let Some(formula) = rewritten {
                    edits.cells.insert(column, CellEdit::ReplaceFormula(formula));
                }
            }

            if let Some(brand_name) = &brand_name {
                let existing = row.cell(COLUMN_C);
                if existing.is_some_and(|cell| {
                    matches!(
                        cell.content,
                        CellContent::Formula(_) | CellContent::SharedFormula { .. }
                    )
                }) {
                    overwritten_formulas += 1;
                }
                edits.cells.insert(
                    COLUMN_C,
                    CellEdit::WriteText {
                        value: brand_name.clone(),
                        insert: existing.is_none(),
                    },
                );
            }

            if !edits.cells.is_empty() {
                rows.insert(row.number, edits);
            }
        }

        Self {
            rows,
            overwritten_formulas,
        }
    }

    pub fn row(&self, number: u32) -> Option<&RowEdits> {
        self.rows.get(&number)
    }

    /// Rows with at least one edit, ascending
    pub fn rows(&self) -> impl Iterator<Item = (u32, &RowEdits)> {
        self.rows.iter().map(|(number, edits)| (*number, edits))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any formula cell loses its formula to literal text
    pub fn overwrites_formulas(&self) -> bool {
        self.overwritten_formulas > 0
    }

    pub fn formula_edits(&self) -> usize {
        self.count(|edit| matches!(edit, CellEdit::ReplaceFormula(_)))
    }

    pub fn text_edits(&self) -> usize {
        self.count(|edit| matches!(edit, CellEdit::WriteText { .. }))
    }

    /// Highest column that receives a newly created cell
    pub fn max_inserted_column(&self) -> Option<u32> {
        self.rows
            .values()
            .filter_map(|row| row.inserted_columns().map(|(column, _)| column).max())
            .max()
    }

    fn count(&self, predicate: impl Fn(&CellEdit) -> bool) -> usize {
        self.rows
            .values()
            .flat_map(|row| row.cells.values())
            .filter(|edit| predicate(edit))
            .count()
    }
}
