//! Appending records to a template by copying its model row down.

use std::path::Path;

use tracing::{debug, info};

use crate::cell::CellValue;
use crate::error::Result;
use crate::formula::translate_formula;
use crate::record::{InputField, LineItem};
use crate::style::StyleSheet;
use crate::template::{open_template, template_error, TemplateLayout, TemplateStructure};
use crate::workbook::CompressionLevel;
use crate::worksheet::Worksheet;

/// Writes records into copies of a template workbook.
#[derive(Clone, Debug, Default)]
pub struct TemplateWriter {
    layout: TemplateLayout,
    compression: CompressionLevel,
}

impl TemplateWriter {
    pub fn new(layout: TemplateLayout) -> Self {
        Self { layout, compression: CompressionLevel::default() }
    }

    /// Compression used for the package parts the write regenerates.
    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    /// Append `records` below the template's last filled row and return the new workbook.
    ///
    /// The template bytes are not modified. With no records the returned
    /// package holds the template's entries unchanged.
    pub fn write(&self, template_bytes: &[u8], records: &[LineItem]) -> Result<Vec<u8>> {
        let mut workbook = open_template(template_bytes)?;
        workbook.set_compression(self.compression);

        let index = self.layout.target_sheet(&workbook);
        let sheet_name = workbook.sheet_name(index).unwrap_or_default().to_string();
        let (sheet, styles) = workbook
            .worksheet_and_styles(index)
            .map_err(|e| template_error(&format!("cannot read sheet '{}'", sheet_name), e))?;
        let structure = self.layout.locate_in(sheet_name, sheet)?;

        let model = ModelRow::capture(sheet, &structure);
        let mut row = structure.next_write_row;
        for record in records {
            model.copy_to(sheet, row);
            self.fill(sheet, styles, &structure, record, row);
            row += 1;
        }

        info!(
            sheet = %structure.sheet_name,
            records = records.len(),
            first_row = structure.next_write_row,
            model_row = structure.model_row,
            "wrote records into template"
        );

        workbook.save_to_bytes()
    }

    /// Read a template from disk, append `records`, and write the result to `output_path`.
    pub fn write_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        template_path: P,
        records: &[LineItem],
        output_path: Q,
    ) -> Result<()> {
        let template = std::fs::read(template_path)?;
        let output = self.write(&template, records)?;
        std::fs::write(output_path, output)?;
        Ok(())
    }

    /// Overwrite the input columns of `row` with the record's values.
    fn fill(
        &self,
        sheet: &mut Worksheet,
        styles: &mut StyleSheet,
        structure: &TemplateStructure,
        record: &LineItem,
        row: u32,
    ) {
        for field in InputField::ALL {
            let Some(column) = structure.column_of(field) else {
                continue;
            };
            let value = field.value(record);
            let mut style = sheet.style_index(row, column);
            if matches!(value, CellValue::Date(_)) {
                style = styles.with_number_format(style, &self.layout.date_format);
            }
            sheet.set_cell(row, column, value, style);
        }
    }
}

/// Snapshot of the model row's cells, by column; `None` where the model has no cell.
struct ModelRow {
    row: u32,
    cells: Vec<(u32, Option<(CellValue, u32)>)>,
}

impl ModelRow {
    fn capture(sheet: &Worksheet, structure: &TemplateStructure) -> Self {
        let row = structure.model_row;
        let cells = (1..=structure.last_column)
            .map(|column| {
                let cell = sheet
                    .value(row, column)
                    .map(|value| (value.clone(), sheet.style_index(row, column)));
                (column, cell)
            })
            .collect();
        Self { row, cells }
    }

    /// Give `destination` the model's formats, values and relocated formulas.
    fn copy_to(&self, sheet: &mut Worksheet, destination: u32) {
        for (column, cell) in &self.cells {
            let column = *column;
            let Some((value, style)) = cell else {
                sheet.clear(destination, column);
                continue;
            };
            let value = match value {
                CellValue::Formula(formula) => {
                    match translate_formula(formula, (self.row, column), (destination, column)) {
                        Ok(moved) => CellValue::Formula(moved),
                        Err(e) => {
                            debug!(formula = %formula, row = destination, column, error = %e, "formula copied untranslated");
                            CellValue::Formula(formula.clone())
                        }
                    }
                }
                other => other.clone(),
            };
            sheet.set_cell(destination, column, value, *style);
        }
    }
}

/// Append records to a template using the default layout.
pub fn write(template_bytes: &[u8], records: &[LineItem]) -> Result<Vec<u8>> {
    TemplateWriter::default().write(template_bytes, records)
}
