//! Locating the header row, model row and write cursor of a template.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{FiscalxlError, Result};
use crate::record::InputField;
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// Where and how records are written into a template workbook.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateLayout {
    /// Preferred sheet; the active sheet is used when it does not exist. Default: `LANCAMENTOS`.
    pub sheet_name: String,
    /// Rows scanned for the header row. Default: 25.
    pub header_scan_rows: u32,
    /// Columns scanned per row while looking for the header. Default: 100.
    pub header_scan_columns: u32,
    /// Columns of the header row turned into the column map. Default: 200.
    pub column_map_width: u32,
    /// Expected headers a row must contain to be the header row. Default: 3.
    pub min_header_matches: usize,
    /// Distance from the header row to the model row. Default: 2.
    pub model_row_offset: u32,
    /// Column whose last filled cell decides where writing resumes. Default: `Data`.
    pub anchor_header: String,
    pub expected_headers: Vec<String>,
    /// Number format given to date cells. Default: `dd/mm/yyyy`.
    pub date_format: String,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            sheet_name: "LANCAMENTOS".to_string(),
            header_scan_rows: 25,
            header_scan_columns: 100,
            column_map_width: 200,
            min_header_matches: 3,
            model_row_offset: 2,
            anchor_header: InputField::Date.header().to_string(),
            expected_headers: [
                InputField::Date,
                InputField::Number,
                InputField::Description,
                InputField::TaxClassCode,
                InputField::BaseValue,
            ]
            .iter()
            .map(|f| f.header().to_string())
            .collect(),
            date_format: "dd/mm/yyyy".to_string(),
        }
    }
}

impl TemplateLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn with_header_scan(mut self, rows: u32, columns: u32) -> Self {
        self.header_scan_rows = rows;
        self.header_scan_columns = columns;
        self
    }

    pub fn with_column_map_width(mut self, width: u32) -> Self {
        self.column_map_width = width;
        self
    }

    pub fn with_min_header_matches(mut self, matches: usize) -> Self {
        self.min_header_matches = matches;
        self
    }

    pub fn with_model_row_offset(mut self, offset: u32) -> Self {
        self.model_row_offset = offset;
        self
    }

    pub fn with_anchor_header(mut self, header: impl Into<String>) -> Self {
        self.anchor_header = header.into();
        self
    }

    pub fn with_expected_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Open a template and find where records go.
    pub fn locate(&self, template_bytes: &[u8]) -> Result<TemplateStructure> {
        let mut workbook = open_template(template_bytes)?;
        let index = self.target_sheet(&workbook);
        let sheet_name = workbook.sheet_name(index).unwrap_or_default().to_string();
        let sheet = workbook
            .worksheet(index)
            .map_err(|e| template_error(&format!("cannot read sheet '{}'", sheet_name), e))?;
        self.locate_in(sheet_name, sheet)
    }

    /// The configured sheet when present, otherwise the active one.
    pub(crate) fn target_sheet(&self, workbook: &Workbook) -> usize {
        workbook
            .sheet_index(&self.sheet_name)
            .unwrap_or_else(|| workbook.active_index())
    }

    pub(crate) fn locate_in(&self, sheet_name: String, sheet: &Worksheet) -> Result<TemplateStructure> {
        let (header_row, header_fallback) = match self.find_header_row(sheet) {
            Some(row) => (row, false),
            None => {
                warn!(sheet = %sheet_name, "no header row found, assuming row 1");
                (1, true)
            }
        };

        let mut columns = BTreeMap::new();
        let mut last_column = 0;
        for column in 1..=self.column_map_width {
            if let Some(text) = sheet.text(header_row, column).filter(|t| !t.is_empty()) {
                columns.insert(text.to_string(), column);
                last_column = column;
            }
        }
        if columns.is_empty() {
            if sheet.is_empty() {
                return Err(FiscalxlError::Template(format!("sheet '{}' has no cells", sheet_name)));
            }
            last_column = sheet.max_column().min(self.column_map_width);
        }

        if !InputField::ALL.iter().any(|f| columns.contains_key(f.header())) {
            warn!(
                sheet = %sheet_name,
                header_row,
                last_column,
                "no input column in the header row, only the model row is copied"
            );
        }

        let model_row = header_row + self.model_row_offset;
        let next_write_row = self.next_write_row(sheet, columns.get(&self.anchor_header).copied(), model_row);

        debug!(
            sheet = %sheet_name,
            header_row,
            model_row,
            next_write_row,
            last_column,
            "located template structure"
        );

        Ok(TemplateStructure {
            sheet_name,
            header_row,
            header_fallback,
            columns,
            last_column,
            model_row,
            next_write_row,
        })
    }

    fn find_header_row(&self, sheet: &Worksheet) -> Option<u32> {
        (1..=self.header_scan_rows).find(|&row| {
            let values: Vec<&str> = (1..=self.header_scan_columns)
                .filter_map(|column| sheet.text(row, column))
                .collect();
            let hits = self
                .expected_headers
                .iter()
                .filter(|expected| values.contains(&expected.as_str()))
                .count();
            hits >= self.min_header_matches
        })
    }

    fn next_write_row(&self, sheet: &Worksheet, anchor: Option<u32>, model_row: u32) -> u32 {
        let max_row = sheet.max_row();
        let Some(column) = anchor else {
            return max_row + 1;
        };
        let mut row = max_row;
        while row >= model_row && sheet.value(row, column).map_or(true, |v| v.is_blank()) {
            row -= 1;
        }
        (row + 1).max(model_row)
    }
}

/// Layout of a template as found on its target sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateStructure {
    pub sheet_name: String,
    pub header_row: u32,
    /// No row matched the expected headers and row 1 was assumed.
    pub header_fallback: bool,
    /// Header text to 1-based column.
    pub columns: BTreeMap<String, u32>,
    pub last_column: u32,
    /// Row whose formulas and formats every new row copies.
    pub model_row: u32,
    pub next_write_row: u32,
}

impl TemplateStructure {
    /// Column of an input field, when the template has one.
    pub fn column_of(&self, field: InputField) -> Option<u32> {
        self.columns.get(field.header()).copied()
    }
}

/// Locate a template with the default layout.
pub fn locate(template_bytes: &[u8]) -> Result<TemplateStructure> {
    TemplateLayout::default().locate(template_bytes)
}

pub(crate) fn open_template(template_bytes: &[u8]) -> Result<Workbook> {
    Workbook::load_from_bytes(template_bytes).map_err(|e| template_error("cannot open template", e))
}

pub(crate) fn template_error(context: &str, source: FiscalxlError) -> FiscalxlError {
    match source {
        FiscalxlError::Template(_) => source,
        other => FiscalxlError::Template(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &str) -> Worksheet {
        let xml = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            rows
        );
        Worksheet::parse(xml.into_bytes(), &[]).unwrap()
    }

    fn text(coord: &str, value: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, coord, value)
    }

    fn header_row(row: u32) -> String {
        let cells: String = ["Data", "Numero", "Item/Serviço", "cClassTrib", "Valor da operação", "vIBS"]
            .iter()
            .enumerate()
            .map(|(i, h)| text(&format!("{}{}", (b'A' + i as u8) as char, row), h))
            .collect();
        format!(r#"<row r="{}">{}</row>"#, row, cells)
    }

    #[test]
    fn header_on_row_two_with_model_row_four() {
        let rows = format!(
            r#"<row r="1">{}</row>{}<row r="3">{}</row><row r="4"><c r="F4"><f>E4*0.1</f></c></row>"#,
            text("A1", "Lançamentos"),
            header_row(2),
            text("A3", "Seção")
        );
        let ws = sheet(&rows);
        let found = TemplateLayout::default().locate_in("LANCAMENTOS".into(), &ws).unwrap();
        assert_eq!(found.header_row, 2);
        assert!(!found.header_fallback);
        assert_eq!(found.model_row, 4);
        assert_eq!(found.last_column, 6);
        assert_eq!(found.column_of(InputField::IbsValue), Some(6));
        assert_eq!(found.column_of(InputField::CbsValue), None);
        // the model row has no date, so writing starts on it
        assert_eq!(found.next_write_row, 4);
    }

    #[test]
    fn decoys_need_three_matches() {
        let rows = format!(
            r#"<row r="1">{}{}</row><row r="3">{}</row>{}"#,
            text("A1", "Data"),
            text("B1", "Numero"),
            text("A3", "Data"),
            header_row(5)
        );
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert_eq!(found.header_row, 5);
        assert_eq!(found.model_row, 7);
    }

    #[test]
    fn cursor_resumes_after_last_dated_row() {
        let rows = format!(
            r#"{}<row r="4"><c r="A4"><v>46030</v></c></row><row r="5"><c r="A5"><v>46031</v></c></row><row r="6"><c r="A6" t="inlineStr"><is><t></t></is></c><c r="F6"><f>E6*0.1</f></c></row>"#,
            header_row(2)
        );
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert_eq!(found.next_write_row, 6);
    }

    #[test]
    fn formula_in_anchor_column_counts_as_filled() {
        let rows = format!(r#"{}<row r="4"><c r="A4"><f>TODAY()</f></c></row>"#, header_row(1));
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert_eq!(found.next_write_row, 5);
    }

    #[test]
    fn fallback_to_row_one() {
        let rows = format!(r#"<row r="1">{}{}</row>"#, text("A1", "vIBS"), text("C1", "Total"));
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert!(found.header_fallback);
        assert_eq!(found.header_row, 1);
        assert_eq!(found.last_column, 3);
        assert_eq!(found.model_row, 3);
    }

    #[test]
    fn headerless_sheet_uses_its_column_count() {
        let rows = r#"<row r="1"><c r="A1"><v>1</v></c><c r="E1"><v>2</v></c></row><row r="3"><c r="A3"><v>3</v></c></row>"#;
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(rows)).unwrap();
        assert!(found.header_fallback);
        assert!(found.columns.is_empty());
        assert_eq!(found.last_column, 5);
        assert_eq!(found.model_row, 3);
        assert_eq!(found.next_write_row, 4);

        let narrow = TemplateLayout::default().with_column_map_width(2);
        assert_eq!(narrow.locate_in("S".into(), &sheet(rows)).unwrap().last_column, 2);
    }

    #[test]
    fn header_row_without_input_columns_is_kept() {
        let rows = format!(r#"<row r="1">{}</row>"#, text("A1", "Total"));
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert_eq!(found.last_column, 1);
        assert_eq!(found.column_of(InputField::Date), None);
    }

    #[test]
    fn empty_sheet_is_refused() {
        let err = TemplateLayout::default().locate_in("S".into(), &sheet("")).unwrap_err();
        assert!(matches!(err, FiscalxlError::Template(_)));
    }

    #[test]
    fn cursor_without_anchor_column_follows_max_row() {
        let cells: String = ["Numero", "Item/Serviço", "cClassTrib"]
            .iter()
            .enumerate()
            .map(|(i, h)| text(&format!("{}1", (b'A' + i as u8) as char), h))
            .collect();
        let rows = format!(r#"<row r="1">{}</row>"#, cells);
        let found = TemplateLayout::default().locate_in("S".into(), &sheet(&rows)).unwrap();
        assert!(!found.header_fallback);
        assert_eq!(found.model_row, 3);
        assert_eq!(found.next_write_row, 2);
    }

    #[test]
    fn layout_builder() {
        let layout = TemplateLayout::new()
            .with_sheet_name("Dados")
            .with_header_scan(10, 20)
            .with_min_header_matches(2)
            .with_expected_headers(["Data", "vIBS"]);
        assert_eq!(layout.sheet_name, "Dados");
        assert_eq!(layout.header_scan_rows, 10);
        assert_eq!(layout.expected_headers, vec!["Data".to_string(), "vIBS".to_string()]);
        assert_eq!(layout.model_row_offset, 2);
    }

    #[test]
    fn garbage_is_a_template_error() {
        assert!(matches!(locate(b"not a zip"), Err(FiscalxlError::Template(_))));
    }
}
