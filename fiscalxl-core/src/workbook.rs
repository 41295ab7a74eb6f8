//! The xlsx package: sheet catalogue, shared strings, styles and save.
//!
//! A loaded workbook keeps the original package bytes. Saving copies every
//! ZIP entry through untouched (`raw_copy_file`, no recompression) except the
//! parts that actually changed: edited worksheets, `styles.xml` when formats
//! were added, and `workbook.xml` when the workbook must be recalculated on
//! open.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::cell::InternedString;
use crate::error::{FiscalxlError, Result};
use crate::style::{prefix_of, qualified, with_attribute, StyleSheet};
use crate::worksheet::Worksheet;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const DEFAULT_STYLES_PATH: &str = "xl/styles.xml";
const DEFAULT_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

/// Elements that follow `calcPr` inside `<workbook>`.
const AFTER_CALC_PR: [&[u8]; 9] = [
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Compression level for the package parts a save rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// No compression - fastest saves, largest files
    None,
    /// Fast compression (deflate level 1)
    Fast,
    /// Default compression (deflate level 6)
    #[default]
    Default,
    /// Best compression (deflate level 9) - smallest files, slowest
    Best,
}

#[derive(Clone, Debug)]
struct SheetEntry {
    name: String,
    path: String,
}

/// An xlsx workbook opened for editing.
pub struct Workbook {
    source: Vec<u8>,
    sheets: Vec<SheetEntry>,
    worksheets: Vec<Option<Worksheet>>,
    active_tab: usize,
    shared_strings: Vec<InternedString>,
    styles: StyleSheet,
    /// Path of the loaded `styles.xml`; `None` when the package has none.
    styles_path: Option<String>,
    compression: CompressionLevel,
}

impl Workbook {
    /// Open a workbook from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            FiscalxlError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open file '{}': {}", path.display(), e),
            ))
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Self::load(data)
    }

    /// Load a workbook from bytes (e.g., an upload held in memory).
    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        Self::load(data.to_vec())
    }

    fn load(source: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(source.as_slice()))?;

        let workbook_xml = read_zip_file_to_vec(&mut archive, WORKBOOK_PATH)?;
        let (sheet_refs, active_tab) = parse_workbook_xml(&workbook_xml)?;
        let rels = match read_zip_file_to_vec(&mut archive, WORKBOOK_RELS_PATH) {
            Ok(xml) => parse_relationships(&xml)?,
            Err(_) => Vec::new(),
        };

        let mut sheets = Vec::with_capacity(sheet_refs.len());
        for (index, (name, rel_id)) in sheet_refs.into_iter().enumerate() {
            let path = rels
                .iter()
                .find(|rel| rel.id == rel_id)
                .map(|rel| resolve_target(&rel.target))
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
            sheets.push(SheetEntry { name, path });
        }
        if sheets.is_empty() {
            return Err(FiscalxlError::NoWorksheets);
        }

        let part_path = |suffix: &str, default: &str| {
            rels.iter()
                .find(|rel| rel.kind.ends_with(suffix))
                .map(|rel| resolve_target(&rel.target))
                .unwrap_or_else(|| default.to_string())
        };
        let shared_strings_path = part_path("/sharedStrings", DEFAULT_SHARED_STRINGS_PATH);
        let styles_path = part_path("/styles", DEFAULT_STYLES_PATH);

        let shared_strings = match read_zip_file_to_vec(&mut archive, &shared_strings_path) {
            Ok(xml) => parse_shared_strings_xml(&xml)?,
            Err(_) => Vec::new(),
        };
        let (styles, styles_path) = match read_zip_file_to_vec(&mut archive, &styles_path) {
            Ok(xml) => (StyleSheet::parse(&xml)?, Some(styles_path)),
            Err(_) => (StyleSheet::minimal(), None),
        };

        let active_tab = if active_tab < sheets.len() { active_tab } else { 0 };
        let worksheets = sheets.iter().map(|_| None).collect();
        drop(archive);

        Ok(Workbook {
            source,
            sheets,
            worksheets,
            active_tab,
            shared_strings,
            styles,
            styles_path,
            compression: CompressionLevel::default(),
        })
    }

    /// Set compression level for the parts a save rewrites.
    pub fn set_compression(&mut self, level: CompressionLevel) {
        self.compression = level;
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheet_name(&self, index: usize) -> Option<&str> {
        self.sheets.get(index).map(|s| s.name.as_str())
    }

    /// Index of the sheet selected when the workbook was last saved.
    pub fn active_index(&self) -> usize {
        self.active_tab
    }

    /// The worksheet at `index`, parsed on first access.
    pub fn worksheet(&mut self, index: usize) -> Result<&mut Worksheet> {
        Ok(self.worksheet_and_styles(index)?.0)
    }

    /// The worksheet at `index` together with the workbook's cell formats.
    pub fn worksheet_and_styles(&mut self, index: usize) -> Result<(&mut Worksheet, &mut StyleSheet)> {
        let entry = self
            .sheets
            .get(index)
            .ok_or_else(|| FiscalxlError::WorksheetNotFound(format!("index {}", index)))?;

        if self.worksheets[index].is_none() {
            let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
            let xml = read_zip_file_to_vec(&mut archive, &entry.path)?;
            let sheet = Worksheet::parse(xml, &self.shared_strings)?;
            debug!(sheet = %entry.name, path = %entry.path, "parsed worksheet");
            self.worksheets[index] = Some(sheet);
        }

        match self.worksheets[index].as_mut() {
            Some(sheet) => Ok((sheet, &mut self.styles)),
            None => Err(FiscalxlError::WorksheetNotFound(format!("index {}", index))),
        }
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// True when a save would differ from the loaded package.
    pub fn is_modified(&self) -> bool {
        self.styles.is_modified() || self.worksheets.iter().flatten().any(Worksheet::is_modified)
    }

    /// Save the workbook to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.save_to_writer(file)
    }

    /// Save the workbook to an in-memory byte vector.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::with_capacity(self.source.len() + 4096));
        self.save_to_writer(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Save the workbook to any writer that implements Write + Seek.
    pub fn save_to_writer<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let replacements = self.changed_parts()?;
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut zip = ZipWriter::new(writer);
        let options = self.file_options();

        for i in 0..archive.len() {
            let name = archive.by_index_raw(i)?.name().to_string();
            match replacements.get(name.as_str()) {
                Some(content) => {
                    zip.start_file(name.as_str(), options)?;
                    zip.write_all(content)?;
                }
                None => zip.raw_copy_file(archive.by_index_raw(i)?)?,
            }
        }

        if self.styles_path.is_none() && self.styles.is_modified() {
            zip.start_file(DEFAULT_STYLES_PATH, options)?;
            zip.write_all(&self.styles.to_minimal_xml()?)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn file_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().large_file(false);
        match self.compression {
            CompressionLevel::None => options.compression_method(CompressionMethod::Stored),
            CompressionLevel::Fast => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(1)),
            CompressionLevel::Default => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(6)),
            CompressionLevel::Best => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(9)),
        }
    }

    /// New content for every package part that changed, keyed by ZIP path.
    fn changed_parts(&self) -> Result<HashMap<&str, Vec<u8>>> {
        let mut parts: HashMap<&str, Vec<u8>> = HashMap::new();
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;

        let mut sheets_changed = false;
        for (entry, sheet) in self.sheets.iter().zip(&self.worksheets) {
            if let Some(sheet) = sheet.as_ref().filter(|s| s.is_modified()) {
                parts.insert(entry.path.as_str(), sheet.to_xml()?);
                sheets_changed = true;
            }
        }

        if sheets_changed {
            let xml = read_zip_file_to_vec(&mut archive, WORKBOOK_PATH)?;
            parts.insert(WORKBOOK_PATH, request_full_calculation(&xml)?);
        }

        if self.styles.is_modified() {
            match &self.styles_path {
                Some(path) => {
                    let xml = read_zip_file_to_vec(&mut archive, path)?;
                    parts.insert(path.as_str(), self.styles.patch(&xml)?);
                }
                None => {
                    let types = read_zip_file_to_vec(&mut archive, CONTENT_TYPES_PATH)?;
                    let override_part = format!(
                        r#"<Override PartName="/{}" ContentType="{}"/>"#,
                        DEFAULT_STYLES_PATH, STYLES_CONTENT_TYPE
                    );
                    parts.insert(CONTENT_TYPES_PATH, insert_before_end(&types, b"Types", &override_part)?);

                    let rels = read_zip_file_to_vec(&mut archive, WORKBOOK_RELS_PATH)?;
                    let relationship = format!(
                        r#"<Relationship Id="{}" Type="{}" Target="styles.xml"/>"#,
                        next_relationship_id(&parse_relationships(&rels)?),
                        STYLES_REL_TYPE
                    );
                    parts.insert(WORKBOOK_RELS_PATH, insert_before_end(&rels, b"Relationships", &relationship)?);
                }
            }
        }

        Ok(parts)
    }
}

/// Read a file from the ZIP archive into a Vec<u8>.
fn read_zip_file_to_vec<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(path).map_err(|e| {
        FiscalxlError::InvalidFormat(format!("Failed to find {} in archive: {}", path, e))
    })?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Target of a workbook relationship as a ZIP path.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Sheets as (name, relationship id) in workbook order, plus the active tab.
fn parse_workbook_xml(xml: &[u8]) -> Result<(Vec<(String, String)>, usize)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut active_tab = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = None;
                    let mut rel_id = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.local_name().as_ref() {
                            b"name" => name = Some(attr.unescape_value()?.into_owned()),
                            b"id" => rel_id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(rel_id)) = (name, rel_id) {
                        sheets.push((name, rel_id));
                    }
                }
                b"workbookView" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"activeTab" {
                            active_tab = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FiscalxlError::ParseError(format!(
                    "XML parsing error in workbook.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab))
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = Relationship { id: String::new(), kind: String::new(), target: String::new() };
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.kind = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FiscalxlError::ParseError(format!(
                    "XML parsing error in relationships: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn next_relationship_id(rels: &[Relationship]) -> String {
    let next = rels
        .iter()
        .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("rId{}", next)
}

fn parse_shared_strings_xml(xml: &[u8]) -> Result<Vec<InternedString>> {
    let mut reader = Reader::from_reader(xml);
    // whitespace inside <t> is significant
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t && !in_phonetic => {
                current_string.push_str(&e.unescape()?);
            }
            Ok(Event::CData(e)) if in_t && !in_phonetic => {
                current_string.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                b"si" => {
                    strings.push(Arc::from(current_string.as_str()));
                    current_string.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(Arc::from("")),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FiscalxlError::ParseError(format!(
                    "XML parsing error in sharedStrings.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Set `fullCalcOnLoad="1"` on `calcPr`, creating the element when absent.
///
/// Only direct children of `<workbook>` are considered; `extLst` and the
/// like nested deeper (inside `workbookView`, say) do not place `calcPr`.
fn request_full_calculation(xml: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64));

    let mut prefix = String::new();
    let mut done = false;
    // open elements, the root included
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if depth == 0 && local.as_ref() == b"workbook" {
                    prefix = prefix_of(&e);
                } else if depth == 1 && local.as_ref() == b"calcPr" {
                    done = true;
                    depth += 1;
                    writer.write_event(Event::Start(with_attribute(&e, "fullCalcOnLoad", "1")?))?;
                    continue;
                } else if depth == 1 && !done && follows_calc_pr(local.as_ref()) {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                depth += 1;
                writer.write_event(Event::Start(e.borrow()))?;
            }
            Ok(Event::Empty(e)) => {
                let local = e.local_name();
                if depth == 1 && local.as_ref() == b"calcPr" {
                    done = true;
                    writer.write_event(Event::Empty(with_attribute(&e, "fullCalcOnLoad", "1")?))?;
                    continue;
                } else if depth == 1 && !done && follows_calc_pr(local.as_ref()) {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                writer.write_event(Event::Empty(e.borrow()))?;
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && !done && e.local_name().as_ref() == b"workbook" {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                writer.write_event(Event::End(e.borrow()))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => {
                return Err(FiscalxlError::ParseError(format!(
                    "XML parsing error in workbook.xml: {}",
                    e
                )));
            }
        }
    }

    Ok(writer.into_inner())
}

fn follows_calc_pr(local: &[u8]) -> bool {
    AFTER_CALC_PR.iter().any(|name| *name == local)
}

fn write_calc_pr<W: Write>(writer: &mut Writer<W>, prefix: &str) -> Result<()> {
    let mut e = quick_xml::events::BytesStart::new(qualified(prefix, "calcPr"));
    e.push_attribute(("fullCalcOnLoad", "1"));
    writer.write_event(Event::Empty(e))?;
    Ok(())
}

/// Copy `xml`, inserting `fragment` just before the closing tag of `root`.
fn insert_before_end(xml: &[u8], root: &[u8], fragment: &str) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + fragment.len()));

    loop {
        match reader.read_event() {
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == root {
                    writer.get_mut().extend_from_slice(fragment.as_bytes());
                }
                writer.write_event(Event::End(e.borrow()))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => {
                return Err(FiscalxlError::ParseError(format!("XML parsing error: {}", e)));
            }
        }
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workbook_xml_with_rids() {
        let xml = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="Resumo" sheetId="1" r:id="rId1"/><sheet name="LAN&amp;CAMENTOS" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let (sheets, active) = parse_workbook_xml(xml).unwrap();
        assert_eq!(sheets, vec![("Resumo".to_string(), "rId1".to_string()), ("LAN&CAMENTOS".to_string(), "rId2".to_string())]);
        assert_eq!(active, 1);
    }

    #[test]
    fn test_parse_relationships() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="/xl/styles.xml"/></Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(resolve_target(&rels[0].target), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target(&rels[1].target), "xl/styles.xml");
        assert_eq!(next_relationship_id(&rels), "rId8");
    }

    #[test]
    fn test_parse_shared_strings_skips_phonetic_runs() {
        let xml = br#"<sst><si><t xml:space="preserve"> Data </t></si><si><r><t>Item/</t></r><r><t>Servi&#231;o</t></r><rPh><t>x</t></rPh></si><si/></sst>"#;
        let strings = parse_shared_strings_xml(xml).unwrap();
        let strings: Vec<&str> = strings.iter().map(|s| s.as_ref()).collect();
        assert_eq!(strings, vec![" Data ", "Item/Serviço", ""]);
    }

    #[test]
    fn test_full_calculation_flag() {
        let with = br#"<workbook><sheets/><calcPr calcId="191029"/></workbook>"#;
        let out = String::from_utf8(request_full_calculation(with).unwrap()).unwrap();
        assert_eq!(out, r#"<workbook><sheets/><calcPr calcId="191029" fullCalcOnLoad="1"/></workbook>"#);

        let without = br#"<x:workbook xmlns:x="ns"><x:sheets/><x:extLst/></x:workbook>"#;
        let out = String::from_utf8(request_full_calculation(without).unwrap()).unwrap();
        assert_eq!(out, r#"<x:workbook xmlns:x="ns"><x:sheets/><x:calcPr fullCalcOnLoad="1"/><x:extLst/></x:workbook>"#);

        let bare = br#"<workbook><sheets/></workbook>"#;
        let out = String::from_utf8(request_full_calculation(bare).unwrap()).unwrap();
        assert_eq!(out, r#"<workbook><sheets/><calcPr fullCalcOnLoad="1"/></workbook>"#);
    }

    #[test]
    fn test_full_calculation_ignores_nested_ext_lst() {
        let nested = br#"<workbook><bookViews><workbookView activeTab="0"><extLst><ext uri="x"/></extLst></workbookView></bookViews><sheets><sheet name="A"/></sheets><definedNames/><extLst/></workbook>"#;
        let out = String::from_utf8(request_full_calculation(nested).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<workbook><bookViews><workbookView activeTab="0"><extLst><ext uri="x"/></extLst></workbookView></bookViews><sheets><sheet name="A"/></sheets><definedNames/><calcPr fullCalcOnLoad="1"/><extLst/></workbook>"#
        );

        let only_nested = br#"<workbook><bookViews><workbookView><extLst/></workbookView></bookViews><sheets/></workbook>"#;
        let out = String::from_utf8(request_full_calculation(only_nested).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<workbook><bookViews><workbookView><extLst/></workbookView></bookViews><sheets/><calcPr fullCalcOnLoad="1"/></workbook>"#
        );
    }

    #[test]
    fn test_insert_before_end() {
        let out = insert_before_end(b"<Types><Default/></Types>", b"Types", "<Override/>").unwrap();
        assert_eq!(out, b"<Types><Default/><Override/></Types>");
    }
}
