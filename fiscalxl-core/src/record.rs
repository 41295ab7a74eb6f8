//! The extracted line item and the nine template fields it fills.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cell::CellValue;

/// Marker stored in [`LineItem::value_source`] when the base value came from `IBSCBS/vBC`.
pub const VALUE_SOURCE_TAG: &str = "IBSCBS/vBC";

/// One taxed detail line of an invoice document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItem {
    pub emission_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub description: String,
    pub tax_class_code: String,
    pub base_value: Option<Decimal>,
    pub ibs_value: Option<Decimal>,
    pub cbs_value: Option<Decimal>,
    /// Uploaded file name, or `archive:entry` for a ZIP member.
    pub source_file: String,
    pub value_source: String,
}

/// The logical fields a record writes into a template row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputField {
    Date,
    Number,
    Description,
    TaxClassCode,
    BaseValue,
    IbsValue,
    CbsValue,
    SourceFile,
    ValueSource,
}

impl InputField {
    /// All fields, in template column order.
    pub const ALL: [InputField; 9] = [
        InputField::Date,
        InputField::Number,
        InputField::Description,
        InputField::TaxClassCode,
        InputField::BaseValue,
        InputField::IbsValue,
        InputField::CbsValue,
        InputField::SourceFile,
        InputField::ValueSource,
    ];

    /// Header label of the field's template column.
    pub fn header(self) -> &'static str {
        match self {
            InputField::Date => "Data",
            InputField::Number => "Numero",
            InputField::Description => "Item/Serviço",
            InputField::TaxClassCode => "cClassTrib",
            InputField::BaseValue => "Valor da operação",
            InputField::IbsValue => "vIBS",
            InputField::CbsValue => "vCBS",
            InputField::SourceFile => "arquivo",
            InputField::ValueSource => "Fonte do valor",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.header() == header)
    }

    /// The cell value this field takes for `item`.
    pub fn value(self, item: &LineItem) -> CellValue {
        match self {
            InputField::Date => item.emission_date.into(),
            InputField::Number => item
                .invoice_number
                .as_deref()
                .map_or(CellValue::Empty, CellValue::from_text),
            InputField::Description => CellValue::from_text(&item.description),
            InputField::TaxClassCode => CellValue::from_text(&item.tax_class_code),
            InputField::BaseValue => item.base_value.into(),
            InputField::IbsValue => item.ibs_value.into(),
            InputField::CbsValue => item.cbs_value.into(),
            InputField::SourceFile => CellValue::from_text(&item.source_file),
            InputField::ValueSource => CellValue::from_text(&item.value_source),
        }
    }
}
