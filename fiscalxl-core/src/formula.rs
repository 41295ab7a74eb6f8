//! Formula tokenizer and reference relocation.
//!
//! Relocating a formula means re-anchoring every relative reference by the
//! distance the formula moves, the way a spreadsheet application does when a
//! row is copied down. Only operand references are touched: string literals,
//! quoted sheet names, function names, structured references and error
//! literals pass through verbatim.

use thiserror::Error;

use crate::utils::{CellReference, LineReference, MAX_COLUMN, MAX_ROW};

/// Why a formula could not be relocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),

    #[error("unterminated quoted sheet name starting at byte {0}")]
    UnterminatedSheetName(usize),

    #[error("unbalanced '[' starting at byte {0}")]
    UnbalancedBracket(usize),

    #[error("reference {0} would move outside the sheet")]
    OutOfBounds(String),
}

/// A lexical piece of a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text copied as-is: operators, literals, names, sheet prefixes.
    Literal(&'a str),
    /// A single-cell reference such as `B4` or `$C$2`.
    Cell(CellReference),
    /// A whole-row range such as `4:6`.
    Rows(LineReference, LineReference),
    /// A whole-column range such as `A:C`.
    Columns(LineReference, LineReference),
}

const ERROR_LITERALS: [&str; 8] = [
    "#NULL!",
    "#DIV/0!",
    "#VALUE!",
    "#REF!",
    "#NAME?",
    "#NUM!",
    "#N/A",
    "#GETTING_DATA",
];

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$' | b'\\' | b'?') || b >= 0x80
}

/// Split a formula (with or without the leading `=`) into tokens.
pub fn tokenize(formula: &str) -> Result<Vec<Token<'_>>, FormulaError> {
    let bytes = formula.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut literal_start = 0usize;
    let mut i = 0usize;

    while i < len {
        match bytes[i] {
            b'"' => i = skip_quoted(bytes, i, b'"').ok_or(FormulaError::UnterminatedString(i))?,
            b'\'' => {
                i = skip_quoted(bytes, i, b'\'').ok_or(FormulaError::UnterminatedSheetName(i))?
            }
            b'[' => i = skip_brackets(bytes, i).ok_or(FormulaError::UnbalancedBracket(i))?,
            b'#' => {
                let rest = &formula[i..];
                i += ERROR_LITERALS
                    .iter()
                    .find(|lit| rest.starts_with(*lit))
                    .map_or(1, |lit| lit.len());
            }
            b if is_word_byte(b) => {
                let start = i;
                while i < len && is_word_byte(bytes[i]) {
                    i += 1;
                }
                let word = &formula[start..i];
                match bytes.get(i) {
                    // function call, sheet prefix or table name
                    Some(b'(') | Some(b'!') | Some(b'[') => continue,
                    Some(b':') => {
                        let second_start = i + 1;
                        let mut j = second_start;
                        while j < len && is_word_byte(bytes[j]) {
                            j += 1;
                        }
                        let second = &formula[second_start..j];
                        if let Some(token) = line_range(word, second) {
                            flush(&mut tokens, formula, literal_start, start);
                            tokens.push(token);
                            i = j;
                            literal_start = j;
                            continue;
                        }
                    }
                    _ => {}
                }
                if let Some(reference) = CellReference::parse(word) {
                    flush(&mut tokens, formula, literal_start, start);
                    tokens.push(Token::Cell(reference));
                    literal_start = i;
                }
            }
            _ => i += 1,
        }
    }
    flush(&mut tokens, formula, literal_start, len);

    Ok(tokens)
}

fn flush<'a>(tokens: &mut Vec<Token<'a>>, formula: &'a str, from: usize, to: usize) {
    if to > from {
        tokens.push(Token::Literal(&formula[from..to]));
    }
}

fn line_range<'a>(first: &str, second: &str) -> Option<Token<'a>> {
    if let (Some(a), Some(b)) = (LineReference::parse_column(first), LineReference::parse_column(second)) {
        return Some(Token::Columns(a, b));
    }
    if let (Some(a), Some(b)) = (LineReference::parse_row(first), LineReference::parse_row(second)) {
        return Some(Token::Rows(a, b));
    }
    None
}

/// Returns the index just past the closing quote. A doubled quote is an escape.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn skip_brackets(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Shift every relative reference in `formula` by the given deltas.
pub fn shift_formula(formula: &str, row_delta: i64, column_delta: i64) -> Result<String, FormulaError> {
    let tokens = tokenize(formula)?;
    let mut out = String::with_capacity(formula.len() + 8);
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Cell(reference) => {
                let moved = reference
                    .offset(row_delta, column_delta)
                    .ok_or_else(|| FormulaError::OutOfBounds(reference.to_string()))?;
                out.push_str(&moved.to_string());
            }
            Token::Rows(a, b) => {
                let (a, b) = shift_line_range(a, b, row_delta, MAX_ROW, |l| l.index.to_string())?;
                out.push_str(&a);
                out.push(':');
                out.push_str(&b);
            }
            Token::Columns(a, b) => {
                let (a, b) = shift_line_range(a, b, column_delta, MAX_COLUMN, |l| {
                    crate::utils::column_to_letter(l.index)
                })?;
                out.push_str(&a);
                out.push(':');
                out.push_str(&b);
            }
        }
    }
    Ok(out)
}

fn shift_line_range(
    a: LineReference,
    b: LineReference,
    delta: i64,
    max: u32,
    render: impl Fn(&LineReference) -> String,
) -> Result<(String, String), FormulaError> {
    let show = |l: &LineReference| format!("{}{}", if l.absolute { "$" } else { "" }, render(l));
    let moved_a = a.offset(delta, max).ok_or_else(|| FormulaError::OutOfBounds(show(&a)))?;
    let moved_b = b.offset(delta, max).ok_or_else(|| FormulaError::OutOfBounds(show(&b)))?;
    Ok((show(&moved_a), show(&moved_b)))
}

/// Translate a formula written in cell `origin` so that it reads correctly
/// from cell `destination`. Both positions are (row, column), 1-indexed.
pub fn translate_formula(
    formula: &str,
    origin: (u32, u32),
    destination: (u32, u32),
) -> Result<String, FormulaError> {
    let row_delta = i64::from(destination.0) - i64::from(origin.0);
    let column_delta = i64::from(destination.1) - i64::from(origin.1);
    if row_delta == 0 && column_delta == 0 {
        return Ok(formula.to_string());
    }
    shift_formula(formula, row_delta, column_delta)
}
