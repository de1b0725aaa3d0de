//! Cell addressing helpers shared by the reader and the sheet writer

/// Column A (1-based).
pub const COLUMN_A: u32 = 1;
/// Column B (1-based).
pub const COLUMN_B: u32 = 2;
/// Column C (1-based).
pub const COLUMN_C: u32 = 3;

/// Convert column letters to a 1-based index (`"A"` -> 1, `"AB"` -> 28).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index)
}

/// Convert a 1-based column index to letters (1 -> `"A"`, 28 -> `"AB"`).
pub fn column_name(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse an A1-style reference into `(row, column)`, both 1-based.
/// Absolute markers (`$`) are ignored.
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let column = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, column))
}

/// Format a `(row, column)` pair as an A1-style reference.
pub fn cell_ref(row: u32, column: u32) -> String {
    format!("{}{}", column_name(column), row)
}

/// Tracks implicit row and column numbering while walking sheet XML.
///
/// Rows and cells may omit their `r` attribute, in which case they follow the
/// previous one.
#[derive(Debug, Default)]
pub struct GridCursor {
    row: u32,
    column: u32,
}

impl GridCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a `<row>` element, returning its 1-based number.
    pub fn enter_row(&mut self, explicit: Option<&str>) -> u32 {
        self.row = explicit
            .and_then(|r| r.trim().parse::<u32>().ok())
            .filter(|r| *r > 0)
            .unwrap_or(self.row + 1);
        self.column = 0;
        self.row
    }

    /// Enter a `<c>` element, returning its 1-based column.
    pub fn enter_cell(&mut self, explicit: Option<&str>) -> u32 {
        self.column = explicit
            .and_then(parse_cell_ref)
            .map(|(_, column)| column)
            .unwrap_or(self.column + 1);
        self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }
}
