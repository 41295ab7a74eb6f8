//! A1-style coordinate parsing, formatting and relocation.

use std::fmt;

use crate::error::{FiscalxlError, Result};

/// Maximum column number in Excel (XFD = 16384).
pub const MAX_COLUMN: u32 = 16384;
/// Maximum row number in Excel.
pub const MAX_ROW: u32 = 1_048_576;

/// Parse an Excel cell coordinate from bytes (e.g., b"A1", b"AB123") into (row, column).
/// Row and column are 1-indexed. Used on the hot path of worksheet parsing.
#[inline]
pub fn parse_coordinate_bytes(bytes: &[u8]) -> Option<(u32, u32)> {
    let (column, rest) = split_column_letters(bytes)?;
    let row = parse_row_digits(rest)?;
    Some((row, column))
}

/// Parse an Excel cell coordinate (e.g., "A1", "AB123") into (row, column).
pub fn parse_coordinate(coord: &str) -> Result<(u32, u32)> {
    let coord = coord.trim();
    parse_coordinate_bytes(coord.as_bytes())
        .ok_or_else(|| FiscalxlError::InvalidCoordinate(format!("Invalid coordinate: {}", coord)))
}

/// Parse a u32 directly from bytes without string allocation.
#[inline]
pub fn parse_u32_bytes(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add((b - b'0') as u32)?;
    }
    Some(result)
}

/// Convert column letters (e.g., "A", "AB", "XFD") to column number (1-indexed).
pub fn letter_to_column(letters: &str) -> Result<u32> {
    match split_column_letters(letters.as_bytes()) {
        Some((column, rest)) if rest.is_empty() => Ok(column),
        _ => Err(FiscalxlError::InvalidCoordinate(format!(
            "Invalid column letters: '{}'",
            letters
        ))),
    }
}

/// Convert column number (1-indexed) to letters (e.g., 1 -> "A", 28 -> "AB").
pub fn column_to_letter(column: u32) -> String {
    let mut result = String::new();
    let mut col = column;

    while col > 0 {
        col -= 1;
        let letter = (b'A' + (col % 26) as u8) as char;
        result.insert(0, letter);
        col /= 26;
    }

    result
}

/// Create a cell coordinate string from row and column (1-indexed).
pub fn coordinate_from_row_col(row: u32, column: u32) -> String {
    format!("{}{}", column_to_letter(column), row)
}

/// Reads the leading column letters, returning the column number and the remaining bytes.
fn split_column_letters(bytes: &[u8]) -> Option<(u32, &[u8])> {
    let mut column: u32 = 0;
    let mut i = 0usize;
    while let Some(&b) = bytes.get(i) {
        let upper = match b {
            b'a'..=b'z' => b - 32,
            b'A'..=b'Z' => b,
            _ => break,
        };
        column = column.checked_mul(26)?.checked_add((upper - b'A' + 1) as u32)?;
        if column > MAX_COLUMN {
            return None;
        }
        i += 1;
    }
    if i == 0 {
        return None;
    }
    Some((column, &bytes[i..]))
}

fn parse_row_digits(bytes: &[u8]) -> Option<u32> {
    let row = parse_u32_bytes(bytes)?;
    if row == 0 || row > MAX_ROW {
        return None;
    }
    Some(row)
}

/// A single A1 reference with its absolute markers, e.g. `$B7` or `C$4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellReference {
    pub row: u32,
    pub column: u32,
    pub row_absolute: bool,
    pub column_absolute: bool,
}

impl CellReference {
    /// Parse `[$]LETTERS[$]DIGITS`. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let (column_absolute, rest) = strip_dollar(bytes);
        let (column, rest) = split_column_letters(rest)?;
        let (row_absolute, rest) = strip_dollar(rest);
        let row = parse_row_digits(rest)?;
        Some(CellReference { row, column, row_absolute, column_absolute })
    }

    /// Shift the relative parts by the given deltas. Absolute parts never move.
    /// Returns `None` when the result would fall outside the sheet.
    pub fn offset(self, row_delta: i64, column_delta: i64) -> Option<Self> {
        let row = if self.row_absolute {
            self.row
        } else {
            shift(self.row, row_delta, MAX_ROW)?
        };
        let column = if self.column_absolute {
            self.column
        } else {
            shift(self.column, column_delta, MAX_COLUMN)?
        };
        Some(CellReference { row, column, ..self })
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column_marker = if self.column_absolute { "$" } else { "" };
        let row_marker = if self.row_absolute { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            column_marker,
            column_to_letter(self.column),
            row_marker,
            self.row
        )
    }
}

/// One side of a whole-row (`3:5`) or whole-column (`B:D`) range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineReference {
    pub index: u32,
    pub absolute: bool,
}

impl LineReference {
    pub fn parse_row(text: &str) -> Option<Self> {
        let (absolute, rest) = strip_dollar(text.as_bytes());
        let index = parse_row_digits(rest)?;
        Some(LineReference { index, absolute })
    }

    pub fn parse_column(text: &str) -> Option<Self> {
        let (absolute, rest) = strip_dollar(text.as_bytes());
        match split_column_letters(rest) {
            Some((index, tail)) if tail.is_empty() => Some(LineReference { index, absolute }),
            _ => None,
        }
    }

    pub fn offset(self, delta: i64, max: u32) -> Option<Self> {
        if self.absolute {
            return Some(self);
        }
        Some(LineReference { index: shift(self.index, delta, max)?, ..self })
    }
}

fn strip_dollar(bytes: &[u8]) -> (bool, &[u8]) {
    match bytes.split_first() {
        Some((b'$', rest)) => (true, rest),
        _ => (false, bytes),
    }
}

fn shift(value: u32, delta: i64, max: u32) -> Option<u32> {
    let shifted = i64::from(value) + delta;
    if shifted < 1 || shifted > i64::from(max) {
        return None;
    }
    u32::try_from(shifted).ok()
}
