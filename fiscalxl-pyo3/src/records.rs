//! Python wrappers for line items, diagnostics and summaries.

use chrono::NaiveDate;
use fiscalxl_core::{Diagnostic, InputField, LineItem, Summary};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rust_decimal::Decimal;

/// One taxed invoice detail, ready to be written as a template row.
#[pyclass(name = "LineItem", module = "fiscalxl")]
#[derive(Clone, Debug, Default)]
pub struct PyLineItem {
    #[pyo3(get, set)]
    pub emission_date: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub invoice_number: Option<String>,
    #[pyo3(get, set)]
    pub description: String,
    #[pyo3(get, set)]
    pub tax_class_code: String,
    #[pyo3(get, set)]
    pub base_value: Option<Decimal>,
    #[pyo3(get, set)]
    pub ibs_value: Option<Decimal>,
    #[pyo3(get, set)]
    pub cbs_value: Option<Decimal>,
    #[pyo3(get, set)]
    pub source_file: String,
    #[pyo3(get, set)]
    pub value_source: String,
}

#[pymethods]
impl PyLineItem {
    #[new]
    #[pyo3(signature = (
        emission_date=None,
        invoice_number=None,
        description=String::new(),
        tax_class_code=String::new(),
        base_value=None,
        ibs_value=None,
        cbs_value=None,
        source_file=String::new(),
        value_source=String::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        emission_date: Option<NaiveDate>,
        invoice_number: Option<String>,
        description: String,
        tax_class_code: String,
        base_value: Option<Decimal>,
        ibs_value: Option<Decimal>,
        cbs_value: Option<Decimal>,
        source_file: String,
        value_source: String,
    ) -> Self {
        PyLineItem {
            emission_date,
            invoice_number,
            description,
            tax_class_code,
            base_value,
            ibs_value,
            cbs_value,
            source_file,
            value_source,
        }
    }

    /// The record keyed by template header labels (`Data`, `Numero`, ...).
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item(InputField::Date.header(), self.emission_date)?;
        dict.set_item(InputField::Number.header(), self.invoice_number.as_deref())?;
        dict.set_item(InputField::Description.header(), self.description.as_str())?;
        dict.set_item(InputField::TaxClassCode.header(), self.tax_class_code.as_str())?;
        dict.set_item(InputField::BaseValue.header(), self.base_value)?;
        dict.set_item(InputField::IbsValue.header(), self.ibs_value)?;
        dict.set_item(InputField::CbsValue.header(), self.cbs_value)?;
        dict.set_item(InputField::SourceFile.header(), self.source_file.as_str())?;
        dict.set_item(InputField::ValueSource.header(), self.value_source.as_str())?;
        Ok(dict)
    }

    fn __eq__(&self, other: &Self) -> bool {
        LineItem::from(self) == LineItem::from(other)
    }

    fn __repr__(&self) -> String {
        format!(
            "LineItem(invoice_number={:?}, description={:?}, tax_class_code={:?}, source_file={:?})",
            self.invoice_number, self.description, self.tax_class_code, self.source_file
        )
    }
}

impl From<LineItem> for PyLineItem {
    fn from(item: LineItem) -> Self {
        PyLineItem {
            emission_date: item.emission_date,
            invoice_number: item.invoice_number,
            description: item.description,
            tax_class_code: item.tax_class_code,
            base_value: item.base_value,
            ibs_value: item.ibs_value,
            cbs_value: item.cbs_value,
            source_file: item.source_file,
            value_source: item.value_source,
        }
    }
}

impl From<&PyLineItem> for LineItem {
    fn from(item: &PyLineItem) -> Self {
        LineItem {
            emission_date: item.emission_date,
            invoice_number: item.invoice_number.clone(),
            description: item.description.clone(),
            tax_class_code: item.tax_class_code.clone(),
            base_value: item.base_value,
            ibs_value: item.ibs_value,
            cbs_value: item.cbs_value,
            source_file: item.source_file.clone(),
            value_source: item.value_source.clone(),
        }
    }
}

pub(crate) fn to_core(records: &[PyRef<'_, PyLineItem>]) -> Vec<LineItem> {
    records.iter().map(|r| LineItem::from(&**r)).collect()
}

pub(crate) fn to_python(records: Vec<LineItem>) -> Vec<PyLineItem> {
    records.into_iter().map(PyLineItem::from).collect()
}

/// A file, or archive entry, that produced no records.
#[pyclass(name = "Diagnostic", module = "fiscalxl", frozen)]
#[derive(Clone, Debug)]
pub struct PyDiagnostic {
    #[pyo3(get)]
    pub source: String,
    /// `"malformed_document"`, `"no_taxable_items"` or `"archive_read"`.
    #[pyo3(get)]
    pub kind: String,
    #[pyo3(get)]
    pub message: String,
}

#[pymethods]
impl PyDiagnostic {
    fn __str__(&self) -> String {
        format!("{}: {}", self.source, self.message)
    }

    fn __repr__(&self) -> String {
        format!("Diagnostic(source={:?}, kind={:?}, message={:?})", self.source, self.kind, self.message)
    }
}

impl From<Diagnostic> for PyDiagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        PyDiagnostic {
            source: diagnostic.source,
            kind: diagnostic.kind.as_str().to_string(),
            message: diagnostic.message,
        }
    }
}

/// Totals over a record set.
#[pyclass(name = "Summary", module = "fiscalxl", frozen)]
#[derive(Clone, Debug)]
pub struct PySummary {
    #[pyo3(get)]
    pub items: usize,
    #[pyo3(get)]
    pub documents: usize,
    #[pyo3(get)]
    pub base_total: Decimal,
    #[pyo3(get)]
    pub ibs_total: Decimal,
    #[pyo3(get)]
    pub cbs_total: Decimal,
    #[pyo3(get)]
    pub tax_total: Decimal,
}

#[pymethods]
impl PySummary {
    fn __repr__(&self) -> String {
        format!(
            "Summary(items={}, documents={}, base_total={}, tax_total={})",
            self.items, self.documents, self.base_total, self.tax_total
        )
    }
}

impl From<Summary> for PySummary {
    fn from(summary: Summary) -> Self {
        PySummary {
            items: summary.items,
            documents: summary.documents,
            base_total: summary.base_total,
            ibs_total: summary.ibs_total,
            cbs_total: summary.cbs_total,
            tax_total: summary.tax_total,
        }
    }
}
