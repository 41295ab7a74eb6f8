//! Template sources, layout keywords and the located structure.

use std::collections::BTreeMap;

use fiscalxl_core::{TemplateLayout, TemplateStructure};
use pyo3::exceptions::{PyIOError, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Where the header, model row and next write row were found.
#[pyclass(name = "TemplateStructure", module = "fiscalxl", frozen)]
#[derive(Clone, Debug)]
pub struct PyTemplateStructure {
    #[pyo3(get)]
    pub sheet_name: String,
    #[pyo3(get)]
    pub header_row: u32,
    /// True when no row qualified and the configured fallback row was used.
    #[pyo3(get)]
    pub header_fallback: bool,
    /// Header label to 1-based column index.
    #[pyo3(get)]
    pub columns: BTreeMap<String, u32>,
    #[pyo3(get)]
    pub last_column: u32,
    #[pyo3(get)]
    pub model_row: u32,
    #[pyo3(get)]
    pub next_write_row: u32,
}

#[pymethods]
impl PyTemplateStructure {
    fn __repr__(&self) -> String {
        format!(
            "TemplateStructure(sheet_name={:?}, header_row={}, model_row={}, next_write_row={})",
            self.sheet_name, self.header_row, self.model_row, self.next_write_row
        )
    }
}

impl From<TemplateStructure> for PyTemplateStructure {
    fn from(found: TemplateStructure) -> Self {
        PyTemplateStructure {
            sheet_name: found.sheet_name,
            header_row: found.header_row,
            header_fallback: found.header_fallback,
            columns: found.columns,
            last_column: found.last_column,
            model_row: found.model_row,
            next_write_row: found.next_write_row,
        }
    }
}

/// Read a template from a file path (str), bytes, or a file-like object with `.read()`.
pub(crate) fn read_source(source: &Bound<'_, PyAny>) -> PyResult<Vec<u8>> {
    if let Ok(path) = source.extract::<&str>() {
        return std::fs::read(path).map_err(|e| PyIOError::new_err(format!("{}: {}", path, e)));
    }

    if let Ok(bytes) = source.extract::<&[u8]>() {
        return Ok(bytes.to_vec());
    }

    if source.hasattr("read")? {
        let bytes_obj = source.call_method0("read")?;
        return Ok(bytes_obj.extract::<&[u8]>()?.to_vec());
    }

    Err(PyTypeError::new_err(
        "Expected file path (str), bytes, or file-like object with .read() method",
    ))
}

/// Build a layout from keyword arguments; unset keys keep their defaults.
pub(crate) fn layout_from(kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<TemplateLayout> {
    let mut layout = TemplateLayout::default();
    let Some(kwargs) = kwargs else {
        return Ok(layout);
    };

    for (key, value) in kwargs.iter() {
        let key: String = key.extract()?;
        layout = match key.as_str() {
            "sheet_name" => layout.with_sheet_name(value.extract::<String>()?),
            "header_scan_rows" => {
                let columns = layout.header_scan_columns;
                layout.with_header_scan(value.extract()?, columns)
            }
            "header_scan_columns" => {
                let rows = layout.header_scan_rows;
                layout.with_header_scan(rows, value.extract()?)
            }
            "column_map_width" => layout.with_column_map_width(value.extract()?),
            "min_header_matches" => layout.with_min_header_matches(value.extract()?),
            "model_row_offset" => layout.with_model_row_offset(value.extract()?),
            "anchor_header" => layout.with_anchor_header(value.extract::<String>()?),
            "expected_headers" => layout.with_expected_headers(value.extract::<Vec<String>>()?),
            "date_format" => layout.with_date_format(value.extract::<String>()?),
            other => {
                return Err(PyTypeError::new_err(format!(
                    "unexpected layout keyword argument '{}'",
                    other
                )))
            }
        };
    }
    Ok(layout)
}
