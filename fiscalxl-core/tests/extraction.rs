mod common;

use chrono::NaiveDate;
use fiscalxl_core::{extract, ingest, write, DiagnosticKind, InputField, Summary, Workbook, CellValue};
use rust_decimal_macros::dec;

use common::*;

#[test]
fn emission_with_time_and_offset() {
    let doc = invoice("1001", "2026-01-08T10:22:33-03:00", &[("Item A", true)]);
    let items = extract(doc.as_bytes(), "nota.xml");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].emission_date, NaiveDate::from_ymd_opt(2026, 1, 8));
    assert_eq!(items[0].invoice_number.as_deref(), Some("1001"));
    assert_eq!(items[0].tax_class_code, "000001");
    assert_eq!(items[0].base_value, Some(dec!(100.00)));
    assert_eq!(items[0].ibs_value, Some(dec!(0.10)));
    assert_eq!(items[0].cbs_value, Some(dec!(0.90)));
}

#[test]
fn only_taxed_details_count() {
    let details = [("A", true), ("B", false), ("C", true), ("D", false), ("E", true)];
    let doc = invoice("7", "2026-02-01", &details);
    let items = extract(doc.as_bytes(), "lote/7.xml");
    let descriptions: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
    assert_eq!(descriptions, vec!["A", "C", "E"]);
    assert!(items.iter().all(|i| i.source_file == "lote/7.xml"));
    assert_eq!(items[1].base_value, Some(dec!(300.00)));
}

#[test]
fn namespaces_do_not_matter() {
    let plain = invoice("55", "2026-01-08", &[("Item", true)]);
    let unqualified = plain.replace(r#" xmlns="http://www.portalfiscal.inf.br/nfe""#, "");
    let prefixed = unqualified
        .replace("<", "<nfe:")
        .replace("<nfe:/", "</nfe:")
        .replace("<nfe:?xml", "<?xml")
        .replace("<nfe:nfeProc ", r#"<nfe:nfeProc xmlns:nfe="urn:other-producer" "#);
    let bom = format!("\u{feff}{}", plain);

    let reference = extract(plain.as_bytes(), "f.xml");
    assert_eq!(reference.len(), 1);
    assert_eq!(extract(unqualified.as_bytes(), "f.xml"), reference);
    assert_eq!(extract(prefixed.as_bytes(), "f.xml"), reference);
    assert_eq!(extract(bom.as_bytes(), "f.xml"), reference);
}

#[test]
fn zip_with_one_valid_and_one_untaxed_entry() {
    let taxed = invoice("1", "2026-01-08", &[("Item", true)]);
    let untaxed = invoice("2", "2026-01-08", &[("Item", false)]);
    let archive = zip_bytes(&[("a.xml", taxed.as_bytes()), ("b.xml", untaxed.as_bytes())]);

    let report = ingest([("lote.zip", archive.as_slice())]);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].source_file, "lote.zip:a.xml");
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].source, "lote.zip:b.xml");
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::NoTaxableItems);
}

#[test]
fn document_without_tax_blocks() {
    let doc = invoice("3", "2026-01-08", &[("X", false), ("Y", false)]);
    let report = ingest([("sem.xml", doc.as_bytes())]);
    assert!(report.records.is_empty());
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::NoTaxableItems);
    assert_eq!(report.diagnostics[0].message, "no items with IBSCBS found");
}

#[test]
fn ingested_records_round_trip_through_the_template() {
    let first = invoice("10", "2026-01-08T08:00:00-03:00", &[("Parafuso", true), ("Frete", true)]);
    let second = invoice("11", "2026-01-09", &[("Porca", true)]);
    let report = ingest([("10.xml", first.as_bytes()), ("11.xml", second.as_bytes())]);
    assert_eq!(report.records.len(), 3);

    let summary = Summary::of(&report.records);
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.base_total, dec!(400.00));
    assert_eq!(summary.tax_total, dec!(3.00));

    let output = write(&reference_template(), &report.records).unwrap();
    let mut workbook = Workbook::load_from_bytes(&output).unwrap();
    let sheet = workbook.worksheet(1).unwrap();

    for (offset, record) in report.records.iter().enumerate() {
        let row = 5 + offset as u32;
        for (column, field) in InputField::ALL.iter().enumerate() {
            let written = sheet.value(row, column as u32 + 1).cloned().unwrap_or(CellValue::Empty);
            let expected = match field.value(record) {
                CellValue::Date(d) => CellValue::Number(fiscalxl_core::cell::date_to_serial(d).into()),
                CellValue::String(s) if s.is_empty() => CellValue::Empty,
                other => other,
            };
            assert_eq!(written, expected, "row {row}, {}", field.header());
        }
        assert_eq!(sheet.value(row, 10), Some(&CellValue::Formula(format!("E{row}*0.1"))));
    }
}
