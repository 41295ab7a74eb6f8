//! Cell formats: the `cellXfs` table of `xl/styles.xml`.
//!
//! Cells refer to a format by index. A [`CellXf`] is an immutable value once
//! it sits in the table; deriving a variant (a date format on top of a copied
//! style, for instance) appends a new record and never edits a shared one.
//! On save the original `styles.xml` is patched in place so fonts, fills,
//! borders, dxfs and anything else the package carries stay untouched.

use std::collections::HashMap;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{FiscalxlError, Result};

/// First id available to custom number formats.
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Alignment properties of a cell format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alignment {
    /// Horizontal alignment: left, center, right, fill, justify, etc.
    pub horizontal: Option<String>,
    /// Vertical alignment: top, center, bottom, justify, distributed.
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub text_rotation: Option<i32>,
    pub indent: Option<u32>,
    pub shrink_to_fit: bool,
    /// Attributes not modelled above, kept in document order.
    pub other: Vec<(String, String)>,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_element(e: &BytesStart) -> Result<Self> {
        let mut alignment = Alignment::new();
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "horizontal" => alignment.horizontal = Some(value),
                "vertical" => alignment.vertical = Some(value),
                "wrapText" => alignment.wrap_text = is_true(&value),
                "textRotation" => alignment.text_rotation = value.parse().ok(),
                "indent" => alignment.indent = value.parse().ok(),
                "shrinkToFit" => alignment.shrink_to_fit = is_true(&value),
                _ => alignment.other.push((key, value)),
            }
        }
        Ok(alignment)
    }

    fn to_element(&self, prefix: &str) -> BytesStart<'static> {
        let mut e = BytesStart::new(qualified(prefix, "alignment"));
        if let Some(h) = &self.horizontal {
            e.push_attribute(("horizontal", h.as_str()));
        }
        if let Some(v) = &self.vertical {
            e.push_attribute(("vertical", v.as_str()));
        }
        if let Some(rotation) = self.text_rotation {
            e.push_attribute(("textRotation", rotation.to_string().as_str()));
        }
        if self.wrap_text {
            e.push_attribute(("wrapText", "1"));
        }
        if let Some(indent) = self.indent {
            e.push_attribute(("indent", indent.to_string().as_str()));
        }
        if self.shrink_to_fit {
            e.push_attribute(("shrinkToFit", "1"));
        }
        for (key, value) in &self.other {
            e.push_attribute((key.as_str(), value.as_str()));
        }
        e
    }
}

/// Protection properties of a cell format. `None` leaves the application default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Protection {
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

impl Protection {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_element(e: &BytesStart) -> Result<Self> {
        let mut protection = Protection::new();
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "locked" => protection.locked = Some(is_true(&value)),
                "hidden" => protection.hidden = Some(is_true(&value)),
                _ => {}
            }
        }
        Ok(protection)
    }

    fn to_element(&self, prefix: &str) -> BytesStart<'static> {
        let mut e = BytesStart::new(qualified(prefix, "protection"));
        if let Some(locked) = self.locked {
            e.push_attribute(("locked", bool_attr(locked)));
        }
        if let Some(hidden) = self.hidden {
            e.push_attribute(("hidden", bool_attr(hidden)));
        }
        e
    }
}

/// One entry of the `cellXfs` table: a complete cell format.
///
/// Font, fill and border are references into their own tables; the number
/// format is a built-in id or a custom `numFmt` id. Apply flags are kept as
/// read (`None` when the attribute was absent).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellXf {
    pub num_fmt_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    /// Index into `cellStyleXfs` (the named style this format derives from).
    pub xf_id: Option<u32>,
    pub apply_number_format: Option<bool>,
    pub apply_font: Option<bool>,
    pub apply_fill: Option<bool>,
    pub apply_border: Option<bool>,
    pub apply_alignment: Option<bool>,
    pub apply_protection: Option<bool>,
    pub quote_prefix: Option<bool>,
    pub alignment: Option<Alignment>,
    pub protection: Option<Protection>,
}

impl CellXf {
    fn from_element(e: &BytesStart) -> Result<Self> {
        let mut xf = CellXf::default();
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "numFmtId" => xf.num_fmt_id = value.parse().unwrap_or(0),
                "fontId" => xf.font_id = value.parse().unwrap_or(0),
                "fillId" => xf.fill_id = value.parse().unwrap_or(0),
                "borderId" => xf.border_id = value.parse().unwrap_or(0),
                "xfId" => xf.xf_id = value.parse().ok(),
                "applyNumberFormat" => xf.apply_number_format = Some(is_true(&value)),
                "applyFont" => xf.apply_font = Some(is_true(&value)),
                "applyFill" => xf.apply_fill = Some(is_true(&value)),
                "applyBorder" => xf.apply_border = Some(is_true(&value)),
                "applyAlignment" => xf.apply_alignment = Some(is_true(&value)),
                "applyProtection" => xf.apply_protection = Some(is_true(&value)),
                "quotePrefix" => xf.quote_prefix = Some(is_true(&value)),
                _ => {}
            }
        }
        Ok(xf)
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>, prefix: &str) -> Result<()> {
        let mut e = BytesStart::new(qualified(prefix, "xf"));
        e.push_attribute(("numFmtId", self.num_fmt_id.to_string().as_str()));
        e.push_attribute(("fontId", self.font_id.to_string().as_str()));
        e.push_attribute(("fillId", self.fill_id.to_string().as_str()));
        e.push_attribute(("borderId", self.border_id.to_string().as_str()));
        if let Some(xf_id) = self.xf_id {
            e.push_attribute(("xfId", xf_id.to_string().as_str()));
        }
        let flags = [
            ("quotePrefix", self.quote_prefix),
            ("applyNumberFormat", self.apply_number_format),
            ("applyFont", self.apply_font),
            ("applyFill", self.apply_fill),
            ("applyBorder", self.apply_border),
            ("applyAlignment", self.apply_alignment),
            ("applyProtection", self.apply_protection),
        ];
        for (key, flag) in flags {
            if let Some(flag) = flag {
                e.push_attribute((key, bool_attr(flag)));
            }
        }

        if self.alignment.is_none() && self.protection.is_none() {
            writer.write_event(Event::Empty(e.borrow()))?;
            return Ok(());
        }
        writer.write_event(Event::Start(e.borrow()))?;
        if let Some(alignment) = &self.alignment {
            writer.write_event(Event::Empty(alignment.to_element(prefix)))?;
        }
        if let Some(protection) = &self.protection {
            writer.write_event(Event::Empty(protection.to_element(prefix)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(qualified(prefix, "xf"))))?;
        Ok(())
    }
}

/// The cell format table of a workbook plus its custom number formats.
#[derive(Clone, Debug)]
pub struct StyleSheet {
    /// Namespace prefix used by the stylesheet's elements (usually empty).
    prefix: String,
    num_fmts: Vec<(u32, String)>,
    cell_xfs: Vec<CellXf>,
    has_num_fmts: bool,
    has_cell_xfs: bool,
    loaded_num_fmts: usize,
    loaded_cell_xfs: usize,
    derived: HashMap<(u32, String), u32>,
}

impl StyleSheet {
    /// The table of a package that carries no `styles.xml`: one default format.
    pub fn minimal() -> Self {
        StyleSheet {
            prefix: String::new(),
            num_fmts: Vec::new(),
            cell_xfs: vec![CellXf::default()],
            has_num_fmts: false,
            has_cell_xfs: true,
            loaded_num_fmts: 0,
            loaded_cell_xfs: 1,
            derived: HashMap::new(),
        }
    }

    /// Read the `numFmts` and `cellXfs` tables of a `styles.xml` part.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut sheet = StyleSheet::minimal();
        sheet.cell_xfs.clear();
        sheet.has_cell_xfs = false;
        let mut state = ParseState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => state.open(&mut sheet, &e, false)?,
                Ok(Event::Empty(e)) => state.open(&mut sheet, &e, true)?,
                Ok(Event::End(e)) => state.close(&mut sheet, e.local_name().as_ref()),
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(FiscalxlError::ParseError(format!(
                        "XML parsing error in styles.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if sheet.cell_xfs.is_empty() {
            sheet.cell_xfs.push(CellXf::default());
        }
        sheet.loaded_num_fmts = sheet.num_fmts.len();
        sheet.loaded_cell_xfs = sheet.cell_xfs.len();
        Ok(sheet)
    }

    pub fn cell_xf(&self, index: u32) -> Option<&CellXf> {
        self.cell_xfs.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.cell_xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_xfs.is_empty()
    }

    /// The number format code a cell format displays with.
    pub fn number_format(&self, index: u32) -> Option<&str> {
        let id = self.cell_xf(index)?.num_fmt_id;
        self.num_fmts
            .iter()
            .find(|(fmt_id, _)| *fmt_id == id)
            .map(|(_, code)| code.as_str())
            .or_else(|| builtin_num_fmt_code(id))
    }

    /// Get the id of a number format code, registering a custom format if needed.
    pub fn get_or_add_num_fmt(&mut self, format: &str) -> u32 {
        if let Some(id) = builtin_num_fmt_id(format) {
            return id;
        }
        if let Some((id, _)) = self.num_fmts.iter().find(|(_, f)| f == format) {
            return *id;
        }
        let id = self
            .num_fmts
            .iter()
            .map(|(id, _)| *id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUM_FMT)
            .max(FIRST_CUSTOM_NUM_FMT);
        self.num_fmts.push((id, format.to_string()));
        id
    }

    /// Index of a format equal to `base` except for its number format.
    ///
    /// An identical record already in the table is reused; otherwise a new
    /// one is appended. Results are cached per (base, format).
    pub fn with_number_format(&mut self, base: u32, format: &str) -> u32 {
        let key = (base, format.to_string());
        if let Some(&index) = self.derived.get(&key) {
            return index;
        }

        let num_fmt_id = self.get_or_add_num_fmt(format);
        let mut xf = self.cell_xf(base).cloned().unwrap_or_default();
        xf.num_fmt_id = num_fmt_id;
        xf.apply_number_format = Some(true);

        let index = match self.cell_xfs.iter().position(|existing| *existing == xf) {
            Some(position) => position as u32,
            None => {
                self.cell_xfs.push(xf);
                (self.cell_xfs.len() - 1) as u32
            }
        };
        self.derived.insert(key, index);
        index
    }

    /// True once formats or number formats were added since loading.
    pub fn is_modified(&self) -> bool {
        self.cell_xfs.len() > self.loaded_cell_xfs || self.num_fmts.len() > self.loaded_num_fmts
    }

    /// Rewrite `original` (the loaded `styles.xml`) with the added records
    /// appended to their tables and the `count` attributes updated. Every
    /// other byte of the part is copied through.
    pub fn patch(&self, original: &[u8]) -> Result<Vec<u8>> {
        let mut reader = Reader::from_reader(original);
        reader.config_mut().trim_text(false);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 512));

        let new_fmts = &self.num_fmts[self.loaded_num_fmts..];
        let new_xfs = &self.cell_xfs[self.loaded_cell_xfs..];
        let mut cell_xfs_written = self.has_cell_xfs;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"styleSheet" => {
                        writer.write_event(Event::Start(e.borrow()))?;
                        if !self.has_num_fmts {
                            self.write_num_fmts(&mut writer, new_fmts)?;
                        }
                    }
                    b"numFmts" => {
                        let count = self.num_fmts.len().to_string();
                        writer.write_event(Event::Start(with_attribute(&e, "count", &count)?))?;
                    }
                    b"cellXfs" => {
                        let count = self.cell_xfs.len().to_string();
                        writer.write_event(Event::Start(with_attribute(&e, "count", &count)?))?;
                    }
                    b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors" | b"extLst"
                        if !cell_xfs_written =>
                    {
                        self.write_cell_xfs(&mut writer, &self.cell_xfs)?;
                        cell_xfs_written = true;
                        writer.write_event(Event::Start(e.borrow()))?;
                    }
                    _ => writer.write_event(Event::Start(e.borrow()))?,
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"styleSheet" => {
                        writer.write_event(Event::Start(e.borrow()))?;
                        self.write_num_fmts(&mut writer, new_fmts)?;
                        self.write_cell_xfs(&mut writer, &self.cell_xfs)?;
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                    }
                    b"numFmts" => self.write_num_fmts(&mut writer, &self.num_fmts)?,
                    b"cellXfs" => self.write_cell_xfs(&mut writer, &self.cell_xfs)?,
                    b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors" | b"extLst"
                        if !cell_xfs_written =>
                    {
                        self.write_cell_xfs(&mut writer, &self.cell_xfs)?;
                        cell_xfs_written = true;
                        writer.write_event(Event::Empty(e.borrow()))?;
                    }
                    _ => writer.write_event(Event::Empty(e.borrow()))?,
                },
                Ok(Event::End(e)) => {
                    match e.local_name().as_ref() {
                        b"numFmts" => {
                            for (id, code) in new_fmts {
                                write_num_fmt(&mut writer, &self.prefix, *id, code)?;
                            }
                        }
                        b"cellXfs" => {
                            for xf in new_xfs {
                                xf.write_xml(&mut writer, &self.prefix)?;
                            }
                        }
                        b"styleSheet" if !cell_xfs_written => {
                            self.write_cell_xfs(&mut writer, &self.cell_xfs)?;
                            cell_xfs_written = true;
                        }
                        _ => {}
                    }
                    writer.write_event(Event::End(e.borrow()))?;
                }
                Ok(Event::Eof) => break,
                Ok(event) => writer.write_event(event)?,
                Err(e) => {
                    return Err(FiscalxlError::ParseError(format!(
                        "XML parsing error in styles.xml: {}",
                        e
                    )));
                }
            }
        }

        Ok(writer.into_inner())
    }

    /// A complete `styles.xml` for a package that had none.
    pub fn to_minimal_xml(&self) -> Result<Vec<u8>> {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"></styleSheet>"#,
        ));
        let body = {
            let mut writer = Writer::new(Vec::new());
            self.write_num_fmts(&mut writer, &self.num_fmts)?;
            writer.write_event(Event::Text(quick_xml::events::BytesText::from_escaped(concat!(
                r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
                r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
                r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
                r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
            ))))?;
            self.write_cell_xfs(&mut writer, &self.cell_xfs)?;
            writer.write_event(Event::Text(quick_xml::events::BytesText::from_escaped(
                r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
            )))?;
            writer.into_inner()
        };
        let insert_at = xml.len() - "</styleSheet>".len();
        xml.insert_str(insert_at, &String::from_utf8_lossy(&body));
        Ok(xml.into_bytes())
    }

    fn write_num_fmts<W: Write>(&self, writer: &mut Writer<W>, fmts: &[(u32, String)]) -> Result<()> {
        if fmts.is_empty() {
            return Ok(());
        }
        let mut start = BytesStart::new(qualified(&self.prefix, "numFmts"));
        start.push_attribute(("count", fmts.len().to_string().as_str()));
        writer.write_event(Event::Start(start))?;
        for (id, code) in fmts {
            write_num_fmt(writer, &self.prefix, *id, code)?;
        }
        writer.write_event(Event::End(BytesEnd::new(qualified(&self.prefix, "numFmts"))))?;
        Ok(())
    }

    fn write_cell_xfs<W: Write>(&self, writer: &mut Writer<W>, xfs: &[CellXf]) -> Result<()> {
        let mut start = BytesStart::new(qualified(&self.prefix, "cellXfs"));
        start.push_attribute(("count", xfs.len().to_string().as_str()));
        writer.write_event(Event::Start(start))?;
        for xf in xfs {
            xf.write_xml(writer, &self.prefix)?;
        }
        writer.write_event(Event::End(BytesEnd::new(qualified(&self.prefix, "cellXfs"))))?;
        Ok(())
    }
}

#[derive(Default)]
struct ParseState {
    in_num_fmts: bool,
    in_cell_xfs: bool,
    current_xf: Option<CellXf>,
}

impl ParseState {
    fn open(&mut self, sheet: &mut StyleSheet, e: &BytesStart, is_empty: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"styleSheet" => sheet.prefix = prefix_of(e),
            b"numFmts" => {
                sheet.has_num_fmts = true;
                self.in_num_fmts = !is_empty;
            }
            b"numFmt" if self.in_num_fmts => {
                let mut id = None;
                let mut code = None;
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "numFmtId" => id = value.parse::<u32>().ok(),
                        "formatCode" => code = Some(value),
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    sheet.num_fmts.push((id, code));
                }
            }
            b"cellXfs" => {
                sheet.has_cell_xfs = true;
                self.in_cell_xfs = !is_empty;
            }
            b"xf" if self.in_cell_xfs => {
                let xf = CellXf::from_element(e)?;
                if is_empty {
                    sheet.cell_xfs.push(xf);
                } else {
                    self.current_xf = Some(xf);
                }
            }
            b"alignment" => {
                if let Some(xf) = self.current_xf.as_mut() {
                    xf.alignment = Some(Alignment::from_element(e)?);
                }
            }
            b"protection" => {
                if let Some(xf) = self.current_xf.as_mut() {
                    xf.protection = Some(Protection::from_element(e)?);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, sheet: &mut StyleSheet, local: &[u8]) {
        match local {
            b"numFmts" => self.in_num_fmts = false,
            b"cellXfs" => self.in_cell_xfs = false,
            b"xf" => {
                if let Some(xf) = self.current_xf.take() {
                    sheet.cell_xfs.push(xf);
                }
            }
            _ => {}
        }
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        StyleSheet::minimal()
    }
}

fn write_num_fmt<W: Write>(writer: &mut Writer<W>, prefix: &str, id: u32, code: &str) -> Result<()> {
    let mut e = BytesStart::new(qualified(prefix, "numFmt"));
    e.push_attribute(("numFmtId", id.to_string().as_str()));
    e.push_attribute(("formatCode", code));
    writer.write_event(Event::Empty(e.borrow()))?;
    Ok(())
}

/// Built-in number format id for a format code.
pub fn builtin_num_fmt_id(format: &str) -> Option<u32> {
    BUILTIN_NUM_FMTS
        .iter()
        .find(|(_, code)| *code == format)
        .map(|(id, _)| *id)
}

/// Format code of a built-in number format id.
pub fn builtin_num_fmt_code(id: u32) -> Option<&'static str> {
    BUILTIN_NUM_FMTS
        .iter()
        .find(|(fmt_id, _)| *fmt_id == id)
        .map(|(_, code)| *code)
}

const BUILTIN_NUM_FMTS: [(u32, &str); 26] = [
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// Unescaped (local key, value) pairs of an element.
fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

/// Copy of `e` with attribute `key` set to `value`, other attributes in place.
pub(crate) fn with_attribute(e: &BytesStart, key: &str, value: &str) -> Result<BytesStart<'static>> {
    let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    let mut replaced = false;
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            out.push_attribute((key, value));
            replaced = true;
        } else {
            out.push_attribute(attr);
        }
    }
    if !replaced {
        out.push_attribute((key, value));
    }
    Ok(out)
}

pub(crate) fn prefix_of(e: &BytesStart) -> String {
    let name = e.name();
    match name.prefix() {
        Some(prefix) => String::from_utf8_lossy(prefix.as_ref()).into_owned(),
        None => String::new(),
    }
}

pub(crate) fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn bool_attr(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="165" formatCode="&quot;R$&quot; #,##0.00"/></numFmts><fonts count="1"><font><sz val="11"/></font></fonts><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="165" fontId="0" fillId="2" borderId="1" xfId="0" applyNumberFormat="1"><alignment horizontal="center"/><protection locked="0"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

    #[test]
    fn parses_cell_formats_and_number_formats() {
        let sheet = StyleSheet::parse(STYLES.as_bytes()).unwrap();
        assert_eq!(sheet.len(), 2);
        let xf = sheet.cell_xf(1).unwrap();
        assert_eq!((xf.fill_id, xf.border_id), (2, 1));
        assert_eq!(xf.alignment.as_ref().unwrap().horizontal.as_deref(), Some("center"));
        assert_eq!(xf.protection, Some(Protection { locked: Some(false), hidden: None }));
        assert_eq!(sheet.number_format(1), Some("\"R$\" #,##0.00"));
        assert_eq!(sheet.number_format(0), Some("General"));
        assert!(!sheet.is_modified());
    }

    #[test]
    fn deriving_a_date_format_appends_one_record() {
        let mut sheet = StyleSheet::parse(STYLES.as_bytes()).unwrap();
        let derived = sheet.with_number_format(1, "dd/mm/yyyy");
        assert_eq!(derived, 2);
        assert_eq!(sheet.with_number_format(1, "dd/mm/yyyy"), 2);
        assert_eq!(sheet.number_format(2), Some("dd/mm/yyyy"));

        let base = sheet.cell_xf(1).unwrap().clone();
        let xf = sheet.cell_xf(2).unwrap();
        assert_eq!(xf.num_fmt_id, 166);
        assert_eq!(xf.fill_id, base.fill_id);
        assert_eq!(xf.alignment, base.alignment);
        assert_eq!(base.num_fmt_id, 165);
        assert!(sheet.is_modified());
    }

    #[test]
    fn patch_appends_records_and_keeps_the_rest() {
        let mut sheet = StyleSheet::parse(STYLES.as_bytes()).unwrap();
        sheet.with_number_format(0, "dd/mm/yyyy");
        let patched = String::from_utf8(sheet.patch(STYLES.as_bytes()).unwrap()).unwrap();

        assert!(patched.contains(r#"<numFmts count="2">"#));
        assert!(patched.contains(r#"<numFmt numFmtId="166" formatCode="dd/mm/yyyy"/>"#));
        assert!(patched.contains(r#"<cellXfs count="3">"#));
        assert!(patched.contains(r#"<fonts count="1"><font><sz val="11"/></font></fonts>"#));
        assert!(patched.contains(r#"<cellStyle name="Normal" xfId="0" builtinId="0"/>"#));

        let reparsed = StyleSheet::parse(patched.as_bytes()).unwrap();
        assert_eq!(reparsed.len(), 3);
        assert_eq!(reparsed.number_format(2), Some("dd/mm/yyyy"));
    }

    #[test]
    fn patch_creates_missing_num_fmts() {
        let xml = r#"<styleSheet xmlns="x"><fonts count="1"><font/></fonts><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellXfs></styleSheet>"#;
        let mut sheet = StyleSheet::parse(xml.as_bytes()).unwrap();
        assert_eq!(sheet.with_number_format(0, "dd/mm/yyyy"), 1);
        let patched = String::from_utf8(sheet.patch(xml.as_bytes()).unwrap()).unwrap();
        assert!(patched.starts_with(
            r#"<styleSheet xmlns="x"><numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts><fonts"#
        ));
        assert!(patched.contains(r#"<cellXfs count="2">"#));
    }

    #[test]
    fn builtin_formats_are_not_registered() {
        let mut sheet = StyleSheet::minimal();
        assert_eq!(sheet.get_or_add_num_fmt("0.00"), 2);
        assert!(!sheet.is_modified());
        assert_eq!(builtin_num_fmt_code(14), Some("mm-dd-yy"));
    }

    #[test]
    fn minimal_stylesheet_round_trips() {
        let mut sheet = StyleSheet::minimal();
        sheet.with_number_format(0, "dd/mm/yyyy");
        let xml = sheet.to_minimal_xml().unwrap();
        let reparsed = StyleSheet::parse(&xml).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.number_format(1), Some("dd/mm/yyyy"));
    }
}
