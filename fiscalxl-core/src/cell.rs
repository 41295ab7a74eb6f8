//! Cell values and their SpreadsheetML encoding.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Shared, immutable string storage used for cell text.
pub type InternedString = Arc<str>;

/// The value held by a worksheet cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    String(InternedString),
    Number(Decimal),
    Boolean(bool),
    /// A calendar date, stored in the file as a 1900-system serial number.
    Date(NaiveDate),
    /// Error literal such as `#REF!`.
    Error(String),
    /// Formula text without the leading `=`.
    Formula(String),
}

impl CellValue {
    /// True for cells a user would see as blank: no value or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn from_text(text: &str) -> Self {
        CellValue::String(Arc::from(text))
    }
}

impl From<Option<Decimal>> for CellValue {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Number)
    }
}

impl From<Option<NaiveDate>> for CellValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Date)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::from_text(value)
    }
}

fn excel_epoch() -> NaiveDate {
    // 1899-12-30 absorbs the 1900 leap-year bug for every date after February 1900.
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Convert a date to its serial number in the 1900 date system.
pub fn date_to_serial(date: NaiveDate) -> i64 {
    date.signed_duration_since(excel_epoch()).num_days()
}

/// Convert a serial number back to a date, ignoring any time fraction.
pub fn serial_to_date(serial: Decimal) -> Option<NaiveDate> {
    let days = u64::try_from(serial.trunc().to_i64()?).ok()?;
    excel_epoch().checked_add_days(Days::new(days))
}

/// Parse the text of a `<v>` element holding a number.
pub(crate) fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(|f| Decimal::try_from(f).ok()))
}

/// Render a decimal the way it goes into a `<v>` element: no exponent, no trailing zeros.
pub(crate) fn format_number(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn serial_numbers_match_the_1900_system() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        assert_eq!(date_to_serial(d), 46030);
        assert_eq!(serial_to_date(dec!(46030.75)), Some(d));
        assert_eq!(date_to_serial(NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()), 61);
    }

    #[test]
    fn numbers_parse_in_plain_and_scientific_form() {
        assert_eq!(parse_number("100.50"), Some(dec!(100.50)));
        assert_eq!(parse_number("1.5E-3"), Some(dec!(0.0015)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(format_number(dec!(100.00)), "100");
        assert_eq!(format_number(dec!(9.50)), "9.5");
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from_text("").is_blank());
        assert!(!CellValue::Formula("A1".into()).is_blank());
        assert!(!CellValue::Number(dec!(0)).is_blank());
    }
}
