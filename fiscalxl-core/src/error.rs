//! Error types for fiscalxl-core.

use thiserror::Error;

/// Errors raised while reading, locating or writing a spreadsheet template.
///
/// Per-document extraction problems never surface here: they become
/// [`crate::ingest::Diagnostic`]s instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FiscalxlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("workbook has no worksheets")]
    NoWorksheets,

    /// The template cannot be used. This is the one error class that aborts a write.
    #[error("template error: {0}")]
    Template(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<quick_xml::events::attributes::AttrError> for FiscalxlError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        FiscalxlError::ParseError(format!("bad XML attribute: {}", e))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FiscalxlError>;
