#![no_main]

//! Fuzz target for the template writer.
//!
//! Builds a small template whose header row, model row and cells come from
//! the fuzzer, writes records into it, and checks that the output opens again
//! with the cursor past the written rows.

use std::io::{Cursor, Write};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use fiscalxl_core::{locate, write, Error, LineItem};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const HEADERS: [&str; 9] = [
    "Data",
    "Numero",
    "Item/Serviço",
    "cClassTrib",
    "Valor da operação",
    "vIBS",
    "vCBS",
    "arquivo",
    "Fonte do valor",
];

#[derive(Arbitrary, Debug)]
struct TemplateInput {
    header_row: u8,
    columns: Vec<u8>,
    model_cells: Vec<(u8, String)>,
    descriptions: Vec<String>,
}

fn cell_xml(coord: &str, text: &str) -> String {
    if let Some(formula) = text.strip_prefix('=') {
        format!("<c r=\"{coord}\"><f>{}</f></c>", escape(formula))
    } else {
        format!("<c r=\"{coord}\" t=\"inlineStr\"><is><t>{}</t></is></c>", escape(text))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn column(index: u8) -> String {
    ((b'A' + index % 26) as char).to_string()
}

fn template(input: &TemplateInput) -> Vec<u8> {
    let header_row = u32::from(input.header_row % 30) + 1;
    let model_row = header_row + 2;

    let mut headers: Vec<(u8, &str)> = input
        .columns
        .iter()
        .take(HEADERS.len())
        .enumerate()
        .map(|(i, c)| (*c % 26, HEADERS[i]))
        .collect();
    headers.sort_by_key(|(c, _)| *c);
    headers.dedup_by_key(|(c, _)| *c);

    let mut model: Vec<(u8, &str)> = input.model_cells.iter().take(26).map(|(c, t)| (*c % 26, t.as_str())).collect();
    model.sort_by_key(|(c, _)| *c);
    model.dedup_by_key(|(c, _)| *c);

    let header_cells: String = headers
        .iter()
        .map(|(c, h)| cell_xml(&format!("{}{}", column(*c), header_row), h))
        .collect();
    let model_cells: String = model
        .iter()
        .map(|(c, t)| cell_xml(&format!("{}{}", column(*c), model_row), t))
        .collect();
    let sheet = format!(
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData><row r=\"{header_row}\">{header_cells}</row><row r=\"{model_row}\">{model_cells}</row></sheetData></worksheet>"
    );

    let parts = [
        ("[Content_Types].xml", "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>".to_string()),
        (
            "xl/workbook.xml",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets><sheet name=\"LANCAMENTOS\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>".to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"><Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/></Relationships>".to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fuzz_target!(|input: TemplateInput| {
    let template = template(&input);
    let records: Vec<LineItem> = input
        .descriptions
        .iter()
        .take(20)
        .map(|d| LineItem {
            description: d.chars().filter(|c| !c.is_control()).collect(),
            ..Default::default()
        })
        .collect();

    let before = match locate(&template) {
        Ok(found) => found,
        Err(Error::Template(_)) => return,
        Err(e) => panic!("unexpected error: {e}"),
    };

    let output = write(&template, &records).expect("a locatable template must be writable");
    let after = locate(&output).expect("output must open again");
    if !before.header_fallback {
        assert_eq!(after.header_row, before.header_row);
    }
    if before.columns.contains_key("Data") && records.is_empty() {
        assert_eq!(after.next_write_row, before.next_write_row);
    }
});
