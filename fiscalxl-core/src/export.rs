//! CSV rendering of a record set.

use crate::error::Result;
use crate::record::{InputField, LineItem};

/// Render records as UTF-8 CSV: the template header labels, then one line per record.
/// Dates are `YYYY-MM-DD`; absent values are empty fields.
pub fn to_csv(records: &[LineItem]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(InputField::ALL.iter().map(|f| f.header()))?;

    for record in records {
        writer.write_record(&[
            option_to_csv(&record.emission_date.map(|d| d.format("%Y-%m-%d"))),
            option_to_csv(&record.invoice_number),
            record.description.clone(),
            record.tax_class_code.clone(),
            option_to_csv(&record.base_value),
            option_to_csv(&record.ibs_value),
            option_to_csv(&record.cbs_value),
            record.source_file.clone(),
            record.value_source.clone(),
        ])?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| crate::error::FiscalxlError::Io(e.into_error()))
}

fn option_to_csv<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
