//! Field-level readers: text lookup, emission date, invoice number, amounts.
//!
//! Every reader is total. A value that cannot be converted resolves to
//! `None` and is logged at debug level; it never aborts a document.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::xml::Element;

const DATE_PATHS: [&str; 4] = [
    ".//infNFe/ide/dhEmi",
    ".//infNFe/ide/dEmi",
    ".//ide/dhEmi",
    ".//ide/dEmi",
];

const NUMBER_PATHS: [&str; 2] = [".//infNFe/ide/nNF", ".//ide/nNF"];

/// Trimmed text of the first element matching `path`, `None` when absent or empty.
pub fn text_at<'a>(element: &'a Element, path: &str) -> Option<&'a str> {
    element.find_text(path)
}

/// Emission date of the document, trying `dhEmi` before `dEmi` and the
/// `infNFe`-scoped paths before the unscoped ones.
pub fn parse_emission_date(root: &Element) -> Option<NaiveDate> {
    DATE_PATHS.iter().find_map(|path| {
        let text = text_at(root, path)?;
        let parsed = parse_date_text(text);
        if parsed.is_none() {
            debug!(path, value = text, "unparseable emission date");
        }
        parsed
    })
}

/// Parse `2026-01-08`, `2026-01-08T10:22:33-03:00` and close variants.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let candidate = match text.split_once('T') {
        Some((date, _)) => date,
        None => text,
    };
    parse_iso_date(candidate).or_else(|| text.get(..10).and_then(parse_iso_date))
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Invoice number (`nNF`), kept as text.
pub fn parse_invoice_number(root: &Element) -> Option<String> {
    NUMBER_PATHS
        .iter()
        .find_map(|path| text_at(root, path))
        .map(str::to_string)
}

/// Convert an amount. Plain and scientific notation are accepted.
pub fn to_decimal(text: Option<&str>) -> Option<Decimal> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    let parsed = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok();
    if parsed.is_none() {
        debug!(value = text, "amount is not a number");
    }
    parsed
}
