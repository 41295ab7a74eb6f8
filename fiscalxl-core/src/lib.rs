//! fiscalxl-core: IBS/CBS line items from invoice XML into xlsx templates.
//!
//! Two pipelines share the record model:
//!
//! - [`ingest`] turns uploaded invoice documents and ZIP archives into
//!   [`LineItem`]s plus per-file [`Diagnostic`]s;
//! - [`TemplateWriter`] appends those records to a copy of a template
//!   workbook, copying its model row down (formats and relocated formulas)
//!   and leaving every other byte of the package untouched.
//!
//! ```no_run
//! use fiscalxl_core::{ingest, write};
//!
//! let xml = std::fs::read("nota.xml")?;
//! let report = ingest([("nota.xml", xml.as_slice())]);
//! let template = std::fs::read("modelo.xlsx")?;
//! let output = write(&template, &report.records)?;
//! std::fs::write("saida.xlsx", output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cell;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod filter;
pub mod formula;
pub mod ingest;
pub mod record;
pub mod style;
pub mod summary;
pub mod template;
pub mod utils;
pub mod workbook;
pub mod worksheet;
pub mod writer;
pub mod xml;

pub use cell::CellValue;
pub use error::{FiscalxlError, FiscalxlError as Error, Result};
pub use export::to_csv;
pub use extract::{extract, extract_document, ExtractError};
pub use filter::{class_codes, date_bounds, KpiFilter, RecordFilter};
pub use formula::{translate_formula, FormulaError};
pub use ingest::{ingest, ingest_with, Diagnostic, DiagnosticKind, IngestOptions, IngestReport, UploadedFile};
pub use record::{InputField, LineItem, VALUE_SOURCE_TAG};
pub use style::StyleSheet;
pub use summary::{summarize, Summary};
pub use template::{locate, TemplateLayout, TemplateStructure};
pub use workbook::{CompressionLevel, Workbook};
pub use worksheet::Worksheet;
pub use writer::{write, TemplateWriter};
