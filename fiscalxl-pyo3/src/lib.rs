//! Python bindings for fiscalxl-core.
//!
//! The dashboard imports this module as `fiscalxl` and never touches the
//! xlsx package or the invoice XML itself.

use std::path::PathBuf;

use chrono::NaiveDate;
use fiscalxl_core::{CompressionLevel, IngestOptions, KpiFilter, RecordFilter, TemplateWriter, UploadedFile};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

mod records;
mod template;

use records::{to_core, to_python, PyDiagnostic, PyLineItem, PySummary};
use template::{layout_from, read_source, PyTemplateStructure};

/// Extract the taxed line items of one invoice document.
///
/// Args:
///     data: The XML payload (bytes)
///     filename: Recorded as `source_file` on every item
///
/// Returns:
///     list[LineItem]: Empty when the document is malformed or has no taxed details
#[pyfunction]
#[pyo3(signature = (data, filename))]
fn extract(data: &[u8], filename: &str) -> Vec<PyLineItem> {
    to_python(fiscalxl_core::extract(data, filename))
}

/// Ingest uploaded files; `.zip` names are expanded into their `.xml` entries.
///
/// Args:
///     files: list of (name, bytes) pairs
///     max_entry_bytes: Size cap for one archive entry
///
/// Returns:
///     tuple[list[LineItem], list[Diagnostic]]
#[pyfunction]
#[pyo3(signature = (files, max_entry_bytes=None))]
fn ingest(
    files: Vec<(String, Bound<'_, PyBytes>)>,
    max_entry_bytes: Option<u64>,
) -> (Vec<PyLineItem>, Vec<PyDiagnostic>) {
    let mut options = IngestOptions::default();
    if let Some(bytes) = max_entry_bytes {
        options = options.with_max_entry_bytes(bytes);
    }

    let uploads = files.iter().map(|(name, data)| UploadedFile::new(name, data.as_bytes()));
    let report = fiscalxl_core::ingest_with(uploads, &options);
    (
        to_python(report.records),
        report.diagnostics.into_iter().map(PyDiagnostic::from).collect(),
    )
}

/// Find the header row, column map, model row and next write row of a template.
///
/// Args:
///     template: File path (str), bytes, or file-like object with .read() method
///     **layout: sheet_name, header_scan_rows, header_scan_columns,
///         column_map_width, min_header_matches, model_row_offset,
///         anchor_header, expected_headers, date_format
#[pyfunction]
#[pyo3(signature = (template, **layout))]
fn locate(template: &Bound<'_, PyAny>, layout: Option<&Bound<'_, PyDict>>) -> PyResult<PyTemplateStructure> {
    let layout = layout_from(layout)?;
    let bytes = read_source(template)?;
    layout
        .locate(&bytes)
        .map(PyTemplateStructure::from)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Append records to a copy of the template and return the new workbook.
///
/// Args:
///     template: File path (str), bytes, or file-like object with .read() method
///     records: list[LineItem]
///     output: Optional path the workbook is also saved to
///     compression: "none", "fast", "default", or "best" for rewritten parts
///     **layout: Same keywords as `locate`
///
/// Returns:
///     bytes: The xlsx file
///
/// Raises:
///     ValueError: The template cannot be used; nothing is written
#[pyfunction]
#[pyo3(signature = (template, records, output=None, compression="default", **layout))]
fn write_template<'py>(
    py: Python<'py>,
    template: &Bound<'py, PyAny>,
    records: Vec<PyRef<'py, PyLineItem>>,
    output: Option<PathBuf>,
    compression: &str,
    layout: Option<&Bound<'py, PyDict>>,
) -> PyResult<Bound<'py, PyBytes>> {
    let writer = TemplateWriter::new(layout_from(layout)?).with_compression(parse_compression(compression)?);
    let template = read_source(template)?;
    let records = to_core(&records);

    let bytes = py
        .allow_threads(|| writer.write(&template, &records))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    if let Some(path) = output {
        std::fs::write(&path, &bytes)
            .map_err(|e| PyValueError::new_err(format!("{}: {}", path.display(), e)))?;
    }
    Ok(PyBytes::new(py, &bytes))
}

fn parse_compression(level: &str) -> PyResult<CompressionLevel> {
    match level.to_lowercase().as_str() {
        "none" | "stored" => Ok(CompressionLevel::None),
        "fast" | "1" => Ok(CompressionLevel::Fast),
        "default" | "6" => Ok(CompressionLevel::Default),
        "best" | "9" => Ok(CompressionLevel::Best),
        _ => Err(PyValueError::new_err(
            "Invalid compression level. Use: 'none', 'fast', 'default', or 'best'",
        )),
    }
}

/// Select records for a dashboard view.
///
/// Args:
///     start, end: Inclusive emission date range; either side may be omitted
///     query: Case-insensitive substring of the description
///     class_code: Exact cClassTrib
///     kpi: "all", "ibs", "cbs", "cred" or "total"; unknown names mean "all"
#[pyfunction]
#[pyo3(signature = (records, start=None, end=None, query=None, class_code=None, kpi="all"))]
fn filter_records(
    records: Vec<PyRef<'_, PyLineItem>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    query: Option<&str>,
    class_code: Option<String>,
    kpi: &str,
) -> Vec<PyLineItem> {
    let mut filter = RecordFilter::new().with_kpi(kpi.parse::<KpiFilter>().unwrap_or_default());
    if start.is_some() || end.is_some() {
        filter = filter.with_period(start.unwrap_or(NaiveDate::MIN), end.unwrap_or(NaiveDate::MAX));
    }
    if let Some(query) = query {
        filter = filter.with_query(query);
    }
    if let Some(code) = class_code {
        filter = filter.with_class_code(code);
    }
    to_python(filter.apply(&to_core(&records)))
}

#[pyfunction]
fn summarize(records: Vec<PyRef<'_, PyLineItem>>) -> PySummary {
    fiscalxl_core::summarize(&to_core(&records)).into()
}

/// Render records as CSV bytes (UTF-8, header labels first).
#[pyfunction]
fn export_csv<'py>(py: Python<'py>, records: Vec<PyRef<'py, PyLineItem>>) -> PyResult<Bound<'py, PyBytes>> {
    let csv = fiscalxl_core::to_csv(&to_core(&records)).map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(PyBytes::new(py, &csv))
}

#[pyfunction]
fn class_codes(records: Vec<PyRef<'_, PyLineItem>>) -> Vec<String> {
    fiscalxl_core::class_codes(&to_core(&records))
}

/// Earliest and latest emission date, or None when no record is dated.
#[pyfunction]
fn date_bounds(records: Vec<PyRef<'_, PyLineItem>>) -> Option<(NaiveDate, NaiveDate)> {
    fiscalxl_core::date_bounds(&to_core(&records))
}

/// Send the core's log events to stderr.
///
/// Args:
///     filter: `EnvFilter` directives such as "info" or "fiscalxl_core=debug";
///         `RUST_LOG` wins when set
///
/// Returns:
///     bool: False when a subscriber was already installed
#[pyfunction]
#[pyo3(signature = (filter="info"))]
fn init_logging(filter: &str) -> PyResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| PyValueError::new_err(e.to_string()))?,
    };

    Ok(tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}

/// The fiscalxl Python module.
#[pymodule]
fn fiscalxl(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Classes
    m.add_class::<PyLineItem>()?;
    m.add_class::<PyDiagnostic>()?;
    m.add_class::<PyTemplateStructure>()?;
    m.add_class::<PySummary>()?;

    // Pipelines
    m.add_function(wrap_pyfunction!(extract, m)?)?;
    m.add_function(wrap_pyfunction!(ingest, m)?)?;
    m.add_function(wrap_pyfunction!(locate, m)?)?;
    m.add_function(wrap_pyfunction!(write_template, m)?)?;

    // Dashboard helpers
    m.add_function(wrap_pyfunction!(filter_records, m)?)?;
    m.add_function(wrap_pyfunction!(summarize, m)?)?;
    m.add_function(wrap_pyfunction!(export_csv, m)?)?;
    m.add_function(wrap_pyfunction!(class_codes, m)?)?;
    m.add_function(wrap_pyfunction!(date_bounds, m)?)?;

    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
