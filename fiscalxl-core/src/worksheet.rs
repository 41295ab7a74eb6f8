//! A worksheet part that can be edited without disturbing what it does not touch.
//!
//! The part is split into the bytes before the rows (everything up to and
//! including `<sheetData>`), the rows, and the bytes after them (merged
//! cells, conditional formats, data validations, page setup...). Rows and
//! cells remember the byte range they were read from; serialising writes
//! those ranges back verbatim and only regenerates what was edited.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::str::FromStr;

use chrono::NaiveDate;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::cell::{date_to_serial, format_number, parse_number, CellValue, InternedString};
use crate::error::{FiscalxlError, Result};
use crate::formula::translate_formula;
use crate::style::{prefix_of, qualified, with_attribute};
use crate::utils::{column_to_letter, coordinate_from_row_col, parse_coordinate_bytes, parse_u32_bytes};

/// How a cell takes part in a shared formula group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SharedRole {
    Master(u32),
    Dependent(u32),
}

#[derive(Clone, Debug)]
struct Cell {
    style: u32,
    value: CellValue,
    /// Source bytes of an untouched cell.
    raw: Option<Range<usize>>,
    shared: Option<SharedRole>,
}

#[derive(Clone, Debug, Default)]
struct Row {
    /// Source bytes of an untouched row.
    raw: Option<Range<usize>>,
    /// Row attributes other than `r` and `spans`, values still escaped.
    attributes: Vec<(String, String)>,
    cells: BTreeMap<u32, Cell>,
}

/// A parsed worksheet part.
#[derive(Debug)]
pub struct Worksheet {
    source: Vec<u8>,
    prefix: String,
    /// Source bytes up to the first row.
    head: Range<usize>,
    /// Source bytes from `</sheetData>` to the end.
    tail: Range<usize>,
    /// The part had `<sheetData/>`; its tags must be written out in full.
    collapsed: bool,
    dimension: Option<(Range<usize>, BytesStart<'static>)>,
    rows: BTreeMap<u32, Row>,
    modified: bool,
}

#[derive(Default)]
struct CellBuilder {
    start: usize,
    row: u32,
    column: u32,
    has_reference: bool,
    style: u32,
    kind: Vec<u8>,
    value_text: String,
    inline_text: String,
    formula: Option<String>,
    shared_index: Option<u32>,
}

impl Worksheet {
    /// Parse a worksheet part. `shared_strings` resolves `t="s"` cells.
    pub fn parse(source: Vec<u8>, shared_strings: &[InternedString]) -> Result<Self> {
        let mut sheet = Worksheet {
            source: Vec::new(),
            prefix: String::new(),
            head: 0..0,
            tail: 0..0,
            collapsed: false,
            dimension: None,
            rows: BTreeMap::new(),
            modified: false,
        };
        let mut pending_dependents: Vec<(u32, u32, u32)> = Vec::new();
        let mut masters: HashMap<u32, ((u32, u32), String)> = HashMap::new();

        {
            let mut reader = Reader::from_reader(source.as_slice());
            reader.config_mut().trim_text(false);

            let mut found_sheet_data = false;
            let mut in_sheet_data = false;
            let mut current_row: Option<(u32, usize, Row)> = None;
            let mut last_row = 0u32;
            let mut last_column = 0u32;
            let mut cell: Option<CellBuilder> = None;
            let mut in_v = false;
            let mut in_f = false;
            let mut in_t = false;
            let mut in_phonetic = false;

            loop {
                let start = reader.buffer_position() as usize;
                let event = reader.read_event().map_err(|e| {
                    FiscalxlError::ParseError(format!("XML parsing error in worksheet: {}", e))
                })?;
                let end = reader.buffer_position() as usize;
                let is_empty = matches!(event, Event::Empty(_));

                match event {
                    Event::Start(e) | Event::Empty(e)
                        if !found_sheet_data && e.local_name().as_ref() == b"dimension" =>
                    {
                        sheet.dimension = Some((start..end, e.into_owned()));
                    }
                    Event::Start(e) if !found_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                        found_sheet_data = true;
                        in_sheet_data = true;
                        sheet.prefix = prefix_of(&e);
                        sheet.head = 0..end;
                    }
                    Event::Empty(e) if !found_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                        found_sheet_data = true;
                        sheet.prefix = prefix_of(&e);
                        sheet.collapsed = true;
                        sheet.head = 0..start;
                        sheet.tail = end..source.len();
                    }
                    Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                        in_sheet_data = false;
                        sheet.tail = start..source.len();
                    }
                    Event::Start(e) | Event::Empty(e)
                        if in_sheet_data && e.local_name().as_ref() == b"row" =>
                    {
                        let (index, has_reference, attributes) = read_row_attributes(&e, last_row)?;
                        last_row = index;
                        last_column = 0;
                        let row = Row {
                            raw: if has_reference { Some(start..end) } else { None },
                            attributes,
                            cells: BTreeMap::new(),
                        };
                        if is_empty {
                            sheet.rows.insert(index, row);
                        } else {
                            current_row = Some((index, start, row));
                        }
                    }
                    Event::End(e) if e.local_name().as_ref() == b"row" => {
                        if let Some((index, row_start, mut row)) = current_row.take() {
                            if row.raw.is_some() {
                                row.raw = Some(row_start..end);
                            }
                            sheet.rows.insert(index, row);
                        }
                    }
                    Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                        let Some((row_index, _, _)) = current_row.as_ref() else {
                            continue;
                        };
                        let builder = read_cell_attributes(&e, *row_index, last_column, start)?;
                        last_column = builder.column;
                        if is_empty {
                            if let Some((_, _, row)) = current_row.as_mut() {
                                let column = builder.column;
                                let has_reference = builder.has_reference;
                                row.cells.insert(
                                    column,
                                    Cell {
                                        style: builder.style,
                                        value: CellValue::Empty,
                                        raw: has_reference.then_some(start..end),
                                        shared: None,
                                    },
                                );
                            }
                        } else {
                            cell = Some(builder);
                        }
                    }
                    Event::End(e) if e.local_name().as_ref() == b"c" => {
                        if let (Some(builder), Some((_, _, row))) = (cell.take(), current_row.as_mut()) {
                            let finished = finish_cell(builder, end, shared_strings, &mut masters, &mut pending_dependents);
                            row.cells.insert(finished.0, finished.1);
                        }
                    }
                    Event::Start(e) if cell.is_some() => match e.local_name().as_ref() {
                        b"v" => in_v = true,
                        b"f" => {
                            in_f = true;
                            if let Some(builder) = cell.as_mut() {
                                read_formula_attributes(&e, builder)?;
                                builder.formula = Some(String::new());
                            }
                        }
                        b"t" => in_t = true,
                        b"rPh" => in_phonetic = true,
                        _ => {}
                    },
                    Event::Empty(e) if cell.is_some() && e.local_name().as_ref() == b"f" => {
                        if let Some(builder) = cell.as_mut() {
                            read_formula_attributes(&e, builder)?;
                        }
                    }
                    Event::End(e) if cell.is_some() => match e.local_name().as_ref() {
                        b"v" => in_v = false,
                        b"f" => in_f = false,
                        b"t" => in_t = false,
                        b"rPh" => in_phonetic = false,
                        _ => {}
                    },
                    Event::Text(t) if cell.is_some() && (in_v || in_f || in_t) => {
                        let text = t.unescape().map_err(|e| {
                            FiscalxlError::ParseError(format!("bad text in worksheet: {}", e))
                        })?;
                        if let Some(builder) = cell.as_mut() {
                            push_cell_text(builder, &text, in_v, in_f, in_t && !in_phonetic);
                        }
                    }
                    Event::CData(c) if cell.is_some() && (in_v || in_f || in_t) => {
                        let text = String::from_utf8_lossy(&c).into_owned();
                        if let Some(builder) = cell.as_mut() {
                            push_cell_text(builder, &text, in_v, in_f, in_t && !in_phonetic);
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }

            if !found_sheet_data {
                return Err(FiscalxlError::InvalidFormat("worksheet has no <sheetData>".into()));
            }
            if !sheet.collapsed && sheet.tail.is_empty() {
                return Err(FiscalxlError::InvalidFormat("worksheet <sheetData> is not closed".into()));
            }
        }

        for (row, column, si) in pending_dependents {
            let Some(((origin_row, origin_column), text)) = masters.get(&si) else {
                debug!(row, column, si, "shared formula without master");
                continue;
            };
            let resolved = translate_formula(text, (*origin_row, *origin_column), (row, column))
                .unwrap_or_else(|e| {
                    debug!(row, column, error = %e, "could not relocate shared formula");
                    text.clone()
                });
            if let Some(cell) = sheet.rows.get_mut(&row).and_then(|r| r.cells.get_mut(&column)) {
                cell.value = CellValue::Formula(resolved);
            }
        }

        sheet.source = source;
        Ok(sheet)
    }

    /// True once a cell was set or cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn value(&self, row: u32, column: u32) -> Option<&CellValue> {
        self.cell(row, column).map(|c| &c.value)
    }

    /// Trimmed text of a string cell.
    pub fn text(&self, row: u32, column: u32) -> Option<&str> {
        self.value(row, column).and_then(CellValue::as_str).map(str::trim)
    }

    /// Cell format index of a cell; 0 (the default format) for absent cells.
    pub fn style_index(&self, row: u32, column: u32) -> u32 {
        self.cell(row, column).map_or(0, |c| c.style)
    }

    /// True when `sheetData` holds no cell at all.
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.cells.is_empty())
    }

    /// Highest row holding at least one cell; 1 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.rows
            .iter()
            .rev()
            .find(|(_, row)| !row.cells.is_empty())
            .map_or(1, |(index, _)| *index)
    }

    /// Highest column holding a cell; 1 for an empty sheet.
    pub fn max_column(&self) -> u32 {
        self.rows
            .values()
            .filter_map(|row| row.cells.keys().next_back().copied())
            .max()
            .unwrap_or(1)
    }

    /// Write a value and format into a cell, replacing whatever it held.
    /// An empty string is stored as a blank cell.
    pub fn set_cell(&mut self, row: u32, column: u32, value: CellValue, style: u32) {
        let value = match value {
            CellValue::String(s) if s.is_empty() => CellValue::Empty,
            other => other,
        };
        self.release_shared(row, column);
        let target = self.rows.entry(row).or_default();
        target.raw = None;
        target.cells.insert(column, Cell { style, value, raw: None, shared: None });
        self.modified = true;
    }

    /// Remove a cell entirely: no value, default format.
    pub fn clear(&mut self, row: u32, column: u32) {
        self.release_shared(row, column);
        if let Some(target) = self.rows.get_mut(&row) {
            if target.cells.remove(&column).is_some() {
                target.raw = None;
                self.modified = true;
            }
        }
    }

    fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&column)
    }

    /// Before a shared-formula master is overwritten, its dependents are
    /// turned into ordinary formulas holding their resolved text.
    fn release_shared(&mut self, row: u32, column: u32) {
        let Some(SharedRole::Master(si)) = self.cell(row, column).and_then(|c| c.shared) else {
            return;
        };
        for target in self.rows.values_mut() {
            let mut touched = false;
            for cell in target.cells.values_mut() {
                if cell.shared == Some(SharedRole::Dependent(si)) {
                    cell.shared = None;
                    cell.raw = None;
                    touched = true;
                }
            }
            if touched {
                target.raw = None;
            }
        }
    }

    /// The `ref` of the `<dimension>` element: the range spanned by all cells.
    pub fn dimension(&self) -> String {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (&index, row) in &self.rows {
            let (Some(&first), Some(&last)) = (row.cells.keys().next(), row.cells.keys().next_back()) else {
                continue;
            };
            bounds = Some(match bounds {
                None => (index, first, index, last),
                Some((r0, c0, r1, c1)) => (r0.min(index), c0.min(first), r1.max(index), c1.max(last)),
            });
        }
        match bounds {
            None => "A1".to_string(),
            Some((r0, c0, r1, c1)) if r0 == r1 && c0 == c1 => coordinate_from_row_col(r0, c0),
            Some((r0, c0, r1, c1)) => format!(
                "{}:{}",
                coordinate_from_row_col(r0, c0),
                coordinate_from_row_col(r1, c1)
            ),
        }
    }

    /// Serialise the part. Untouched rows and cells are copied byte for byte.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.source.len() + 4096);

        match &self.dimension {
            Some((range, element)) if self.modified => {
                out.extend_from_slice(&self.source[self.head.start..range.start]);
                let updated = with_attribute(element, "ref", &self.dimension())?;
                let mut writer = Writer::new(&mut out);
                writer.write_event(Event::Empty(updated))?;
                out.extend_from_slice(&self.source[range.end..self.head.end]);
            }
            _ => out.extend_from_slice(&self.source[self.head.clone()]),
        }
        if self.collapsed {
            out.push(b'<');
            out.extend_from_slice(qualified(&self.prefix, "sheetData").as_bytes());
            out.push(b'>');
        }

        let mut itoa_buf = itoa::Buffer::new();
        for (&index, row) in &self.rows {
            match &row.raw {
                Some(range) => out.extend_from_slice(&self.source[range.clone()]),
                None => self.write_row(&mut out, index, row, &mut itoa_buf),
            }
        }

        if self.collapsed {
            out.extend_from_slice(b"</");
            out.extend_from_slice(qualified(&self.prefix, "sheetData").as_bytes());
            out.push(b'>');
        }
        out.extend_from_slice(&self.source[self.tail.clone()]);
        Ok(out)
    }

    fn write_row(&self, out: &mut Vec<u8>, index: u32, row: &Row, itoa_buf: &mut itoa::Buffer) {
        let row_tag = qualified(&self.prefix, "row");
        out.push(b'<');
        out.extend_from_slice(row_tag.as_bytes());
        out.extend_from_slice(b" r=\"");
        out.extend_from_slice(itoa_buf.format(index).as_bytes());
        out.push(b'"');
        for (key, value) in &row.attributes {
            out.push(b' ');
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b"=\"");
            out.extend_from_slice(value.as_bytes());
            out.push(b'"');
        }
        if row.cells.is_empty() {
            out.extend_from_slice(b"/>");
            return;
        }
        out.push(b'>');
        for (&column, cell) in &row.cells {
            match &cell.raw {
                Some(range) => out.extend_from_slice(&self.source[range.clone()]),
                None => self.write_cell(out, index, column, cell, itoa_buf),
            }
        }
        out.extend_from_slice(b"</");
        out.extend_from_slice(row_tag.as_bytes());
        out.push(b'>');
    }

    fn write_cell(&self, out: &mut Vec<u8>, row: u32, column: u32, cell: &Cell, itoa_buf: &mut itoa::Buffer) {
        let tag = |local: &str| qualified(&self.prefix, local);
        let c = tag("c");
        out.push(b'<');
        out.extend_from_slice(c.as_bytes());
        out.extend_from_slice(b" r=\"");
        out.extend_from_slice(column_to_letter(column).as_bytes());
        out.extend_from_slice(itoa_buf.format(row).as_bytes());
        out.push(b'"');
        if cell.style != 0 {
            out.extend_from_slice(b" s=\"");
            out.extend_from_slice(itoa_buf.format(cell.style).as_bytes());
            out.push(b'"');
        }

        let (kind, body): (Option<&str>, Option<String>) = match &cell.value {
            CellValue::Empty => (None, None),
            CellValue::Number(n) => (None, Some(wrap(&tag("v"), &format_number(*n)))),
            CellValue::Date(d) => (None, Some(wrap(&tag("v"), itoa_buf.format(date_to_serial(*d))))),
            CellValue::Boolean(b) => (Some("b"), Some(wrap(&tag("v"), if *b { "1" } else { "0" }))),
            CellValue::Error(e) => (Some("e"), Some(wrap(&tag("v"), &escape(e.as_str())))),
            CellValue::Formula(f) => {
                let text = f.strip_prefix('=').unwrap_or(f);
                (None, Some(wrap(&tag("f"), &escape(text))))
            }
            CellValue::String(s) => {
                let t = tag("t");
                let inner = if s.trim() != s.as_ref() || s.contains('\n') {
                    format!("<{} xml:space=\"preserve\">{}</{}>", t, escape(s.as_ref()), t)
                } else {
                    wrap(&t, &escape(s.as_ref()))
                };
                (Some("inlineStr"), Some(wrap(&tag("is"), &inner)))
            }
        };

        if let Some(kind) = kind {
            out.extend_from_slice(b" t=\"");
            out.extend_from_slice(kind.as_bytes());
            out.push(b'"');
        }
        match body {
            None => out.extend_from_slice(b"/>"),
            Some(body) => {
                out.push(b'>');
                out.extend_from_slice(body.as_bytes());
                out.extend_from_slice(b"</");
                out.extend_from_slice(c.as_bytes());
                out.push(b'>');
            }
        }
    }
}

fn wrap(tag: &str, text: &str) -> String {
    format!("<{}>{}</{}>", tag, text, tag)
}

fn read_row_attributes(e: &BytesStart, previous: u32) -> Result<(u32, bool, Vec<(String, String)>)> {
    let mut index = None;
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => index = parse_u32_bytes(&attr.value),
            b"spans" => {}
            key => attributes.push((
                String::from_utf8_lossy(key).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )),
        }
    }
    match index {
        Some(index) => Ok((index, true, attributes)),
        None => Ok((previous + 1, false, attributes)),
    }
}

fn read_cell_attributes(e: &BytesStart, row: u32, previous_column: u32, start: usize) -> Result<CellBuilder> {
    let mut builder = CellBuilder { start, row, column: previous_column + 1, ..Default::default() };
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => {
                if let Some((_, column)) = parse_coordinate_bytes(&attr.value) {
                    builder.column = column;
                    builder.has_reference = true;
                }
            }
            b"s" => builder.style = parse_u32_bytes(&attr.value).unwrap_or(0),
            b"t" => builder.kind = attr.value.to_vec(),
            _ => {}
        }
    }
    Ok(builder)
}

fn read_formula_attributes(e: &BytesStart, builder: &mut CellBuilder) -> Result<()> {
    let mut shared = false;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"t" => shared = attr.value.as_ref() == b"shared",
            b"si" => builder.shared_index = parse_u32_bytes(&attr.value),
            _ => {}
        }
    }
    if !shared {
        builder.shared_index = None;
    }
    Ok(())
}

fn push_cell_text(builder: &mut CellBuilder, text: &str, in_v: bool, in_f: bool, in_t: bool) {
    if in_f {
        if let Some(formula) = builder.formula.as_mut() {
            formula.push_str(text);
        }
    } else if in_v {
        builder.value_text.push_str(text);
    } else if in_t {
        builder.inline_text.push_str(text);
    }
}

fn finish_cell(
    mut builder: CellBuilder,
    end: usize,
    shared_strings: &[InternedString],
    masters: &mut HashMap<u32, ((u32, u32), String)>,
    pending_dependents: &mut Vec<(u32, u32, u32)>,
) -> (u32, Cell) {
    let formula = builder.formula.take().filter(|f| !f.is_empty());
    let shared = match (builder.shared_index, formula.as_ref()) {
        (Some(si), Some(text)) => {
            masters.insert(si, ((builder.row, builder.column), text.clone()));
            Some(SharedRole::Master(si))
        }
        (Some(si), None) => {
            pending_dependents.push((builder.row, builder.column, si));
            Some(SharedRole::Dependent(si))
        }
        (None, _) => None,
    };

    let value = match formula {
        Some(text) => CellValue::Formula(text),
        // a dependent keeps its cached value until its master's text is relocated
        None => decode_value(&builder, shared_strings),
    };

    let cell = Cell {
        style: builder.style,
        value,
        raw: builder.has_reference.then_some(builder.start..end),
        shared,
    };
    (builder.column, cell)
}

fn decode_value(builder: &CellBuilder, shared_strings: &[InternedString]) -> CellValue {
    let text = builder.value_text.as_str();
    match builder.kind.as_slice() {
        b"s" => match text.trim().parse::<usize>().ok().and_then(|i| shared_strings.get(i)) {
            Some(s) => CellValue::String(s.clone()),
            None => {
                debug!(row = builder.row, column = builder.column, index = text, "bad shared string index");
                CellValue::Empty
            }
        },
        b"inlineStr" => CellValue::from_text(&builder.inline_text),
        b"str" => CellValue::from_text(text),
        b"b" => CellValue::Boolean(text.trim() == "1"),
        b"e" => CellValue::Error(text.to_string()),
        b"d" => NaiveDate::from_str(text.get(..10).unwrap_or(text))
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::from_text(text)),
        _ if text.is_empty() => CellValue::Empty,
        _ => parse_number(text).map_or_else(|| CellValue::from_text(text), CellValue::Number),
    }
}
