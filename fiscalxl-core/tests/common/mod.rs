//! In-memory fixtures: xlsx templates, invoice documents and ZIP uploads.
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const HEADERS: [&str; 11] = [
    "Data",
    "Numero",
    "Item/Serviço",
    "cClassTrib",
    "Valor da operação",
    "vIBS",
    "vCBS",
    "arquivo",
    "Fonte do valor",
    "Base IBS",
    "Total tributos",
];

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="4" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// A one- or two-sheet template package, assembled part by part.
pub struct TemplateBuilder {
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    styles: Option<String>,
    active_tab: usize,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self { sheets: Vec::new(), shared_strings: Vec::new(), styles: Some(STYLES.to_string()), active_tab: 0 }
    }

    pub fn sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push((name.to_string(), rows.to_string()));
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_styles(mut self) -> Self {
        self.styles = None;
        self
    }

    pub fn active_tab(mut self, tab: usize) -> Self {
        self.active_tab = tab;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut sheets_xml = String::new();
        let mut parts: Vec<(String, String)> = Vec::new();

        for (i, (name, rows)) in self.sheets.iter().enumerate() {
            let n = i + 1;
            types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
            sheets_xml.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
            parts.push((
                format!("xl/worksheets/sheet{n}.xml"),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><dimension ref="A1"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/><sheetData>{rows}</sheetData><dataValidations count="1"><dataValidation type="list" sqref="D4:D500"><formula1>"000001,200001"</formula1></dataValidation></dataValidations><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#
                ),
            ));
        }

        let mut next_id = self.sheets.len() + 1;
        if !self.shared_strings.is_empty() {
            types.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            rels.push_str(&format!(
                r#"<Relationship Id="rId{next_id}" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
            next_id += 1;
            let items: String = self.shared_strings.iter().map(|s| format!("<si><t>{s}</t></si>")).collect();
            parts.push((
                "xl/sharedStrings.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NS}" count="{c}" uniqueCount="{c}">{items}</sst>"#,
                    c = self.shared_strings.len()
                ),
            ));
        }
        if let Some(styles) = &self.styles {
            types.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
            rels.push_str(&format!(
                r#"<Relationship Id="rId{next_id}" Type="{REL_NS}/styles" Target="styles.xml"/>"#
            ));
            parts.push(("xl/styles.xml".to_string(), styles.clone()));
        }
        types.push_str("</Types>");
        rels.push_str("</Relationships>");

        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><bookViews><workbookView activeTab="{}"/></bookViews><sheets>{sheets_xml}</sheets><calcPr calcId="191029"/></workbook>"#,
            self.active_tab
        );

        let mut entries = vec![
            ("[Content_Types].xml".to_string(), types),
            (
                "_rels/.rels".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                ),
            ),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
        ];
        entries.extend(parts);
        zip_bytes(&entries.iter().map(|(n, d)| (n.as_str(), d.as_bytes())).collect::<Vec<_>>())
    }
}

/// Inline string cell.
pub fn text(coord: &str, value: &str) -> String {
    format!(r#"<c r="{coord}" t="inlineStr"><is><t>{value}</t></is></c>"#)
}

/// Header cells for `HEADERS`, starting at column A of `row`.
pub fn header_cells(row: u32) -> String {
    HEADERS
        .iter()
        .enumerate()
        .map(|(i, h)| text(&format!("{}{}", (b'A' + i as u8) as char, row), h))
        .collect()
}

/// The reference layout: title on row 1, headers on row 2, a section label on
/// row 3 and a filled model row 4 carrying formats and formulas.
pub fn reference_template() -> Vec<u8> {
    let rows = format!(
        concat!(
            r#"<row r="1">{title}</row>"#,
            r#"<row r="2" s="3" customFormat="1">{headers}</row>"#,
            r#"<row r="3">{section}</row>"#,
            r#"<row r="4" spans="1:11"><c r="A4" s="2"><v>46000</v></c>{number}<c r="E4" s="1"><v>10</v></c><c r="F4" s="1"><v>0.01</v></c><c r="G4" s="1"><v>0.09</v></c>"#,
            r#"<c r="J4" s="1"><f>E4*0.1</f><v>1</v></c><c r="K4" s="1"><f>SUM(F4:G4)+$E$4*0</f><v>0.1</v></c></row>"#
        ),
        title = text("A1", "Apuração IBS/CBS"),
        headers = header_cells(2),
        section = text("A3", "Lançamentos"),
        number = text("B4", "1"),
    );
    TemplateBuilder::new().sheet("Resumo", "").sheet("LANCAMENTOS", &rows).build()
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Every entry of a package as (name, uncompressed bytes), in archive order.
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

pub fn zip_entry(bytes: &[u8], name: &str) -> String {
    zip_entries(bytes)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| String::from_utf8(data).unwrap())
        .unwrap_or_else(|| panic!("no entry {name}"))
}

/// An NF-e document with one detail per `(description, taxed)` pair.
pub fn invoice(number: &str, emitted: &str, details: &[(&str, bool)]) -> String {
    let dets: String = details
        .iter()
        .enumerate()
        .map(|(i, (description, taxed))| {
            let tax = if *taxed {
                format!(
                    "<IBSCBS><CST>000</CST><cClassTrib>000001</cClassTrib><gIBSCBS><vBC>{base}.00</vBC><gIBSUF><pIBSUF>0.10</pIBSUF><vIBSUF>0.10</vIBSUF></gIBSUF><vIBS>0.10</vIBS><gCBS><pCBS>0.90</pCBS><vCBS>0.90</vCBS></gCBS></gIBSCBS></IBSCBS>",
                    base = 100 * (i + 1)
                )
            } else {
                "<ICMS><ICMS00><vICMS>18.00</vICMS></ICMS00></ICMS>".to_string()
            };
            format!(
                r#"<det nItem="{}"><prod><cProd>{}</cProd><xProd>{description}</xProd></prod><imposto>{tax}</imposto></det>"#,
                i + 1,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><nfeProc xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00"><NFe><infNFe Id="NFe{number}" versao="4.00"><ide><cUF>35</cUF><nNF>{number}</nNF><dhEmi>{emitted}</dhEmi></ide>{dets}<total/></infNFe></NFe></nfeProc>"#
    )
}
