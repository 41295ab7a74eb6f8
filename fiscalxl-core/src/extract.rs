//! Line-item extraction from one invoice document.

use thiserror::Error;
use tracing::debug;

use crate::fields::{parse_emission_date, parse_invoice_number, text_at, to_decimal};
use crate::record::{LineItem, VALUE_SOURCE_TAG};
use crate::xml::{self, Element};

/// Why a document produced no records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("could not read file: {0}")]
    MalformedDocument(String),

    #[error("no items with IBSCBS found")]
    NoTaxableItems,
}

/// Extract the taxed line items of a document; malformed input yields none.
pub fn extract(xml_bytes: &[u8], filename: &str) -> Vec<LineItem> {
    match extract_document(xml_bytes, filename) {
        Ok(items) => items,
        Err(e) => {
            debug!(file = filename, error = %e, "document yielded no items");
            Vec::new()
        }
    }
}

/// Extract the taxed line items of a document, reporting why none were found.
pub fn extract_document(xml_bytes: &[u8], filename: &str) -> Result<Vec<LineItem>, ExtractError> {
    let root = xml::parse(xml_bytes).map_err(|e| ExtractError::MalformedDocument(e.0))?;
    let items = extract_from_root(&root, filename);
    if items.is_empty() {
        return Err(ExtractError::NoTaxableItems);
    }
    Ok(items)
}

fn extract_from_root(root: &Element, filename: &str) -> Vec<LineItem> {
    let emission_date = parse_emission_date(root);
    let invoice_number = parse_invoice_number(root);

    let mut details = root.find_all(".//infNFe/det");
    if details.is_empty() {
        details = root.find_all(".//det");
    }

    details
        .into_iter()
        .filter_map(|det| {
            // details without the IBS/CBS block are not taxed under the new regime
            let tax = det.find(".//imposto/IBSCBS")?;
            let base_value = to_decimal(text_at(tax, ".//vBC"));
            Some(LineItem {
                emission_date,
                invoice_number: invoice_number.clone(),
                description: text_at(det, ".//prod/xProd").unwrap_or_default().to_string(),
                tax_class_code: text_at(tax, ".//cClassTrib").unwrap_or_default().to_string(),
                base_value,
                ibs_value: to_decimal(text_at(tax, ".//vIBS")),
                cbs_value: to_decimal(text_at(tax, ".//vCBS")),
                source_file: filename.to_string(),
                value_source: base_value.map_or("", |_| VALUE_SOURCE_TAG).to_string(),
            })
        })
        .collect()
}
