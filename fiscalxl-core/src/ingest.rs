//! Batch ingestion of uploaded invoice files and ZIP archives.
//!
//! Nothing in a batch is fatal: every file or archive entry that fails, or
//! yields no taxed items, becomes a [`Diagnostic`] and the batch moves on.

use std::fmt;
use std::io::{Cursor, Read};

use tracing::{info, warn};
use zip::ZipArchive;

use crate::extract::{extract_document, ExtractError};
use crate::record::LineItem;

/// One uploaded file: a name and its bytes.
#[derive(Clone, Copy, Debug)]
pub struct UploadedFile<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

impl<'a> UploadedFile<'a> {
    pub fn new(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data }
    }
}

impl<'a> From<(&'a str, &'a [u8])> for UploadedFile<'a> {
    fn from((name, data): (&'a str, &'a [u8])) -> Self {
        Self { name, data }
    }
}

impl<'a> From<&'a (String, Vec<u8>)> for UploadedFile<'a> {
    fn from(file: &'a (String, Vec<u8>)) -> Self {
        Self { name: &file.0, data: &file.1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The document is not well-formed XML.
    MalformedDocument,
    /// The document parsed but holds no detail with an IBS/CBS block.
    NoTaxableItems,
    /// Corrupt archive, archive without XML entries, or an unreadable or oversized entry.
    ArchiveRead,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedDocument => "malformed_document",
            DiagnosticKind::NoTaxableItems => "no_taxable_items",
            DiagnosticKind::ArchiveRead => "archive_read",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or archive entry that contributed no records, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// File name, or `archive:entry` for an archive member.
    pub source: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn new(source: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self { source: source.into(), kind, message: message.into() }
    }

    fn from_extract(source: String, error: &ExtractError) -> Self {
        let kind = match error {
            ExtractError::MalformedDocument(_) => DiagnosticKind::MalformedDocument,
            ExtractError::NoTaxableItems => DiagnosticKind::NoTaxableItems,
        };
        Self::new(source, kind, error.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Largest archive entry that will be inflated. Default: 64 MiB.
    pub max_entry_bytes: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { max_entry_bytes: 64 * 1024 * 1024 }
    }
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entry_bytes(mut self, bytes: u64) -> Self {
        self.max_entry_bytes = bytes;
        self
    }
}

/// Records of a batch, in input order, and the diagnostics it produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
    pub records: Vec<LineItem>,
    pub diagnostics: Vec<Diagnostic>,
}

impl IngestReport {
    fn add_document(&mut self, source: String, data: &[u8]) {
        match extract_document(data, &source) {
            Ok(items) => self.records.extend(items),
            Err(e) => self.push(Diagnostic::from_extract(source, &e)),
        }
    }

    fn add_archive(&mut self, name: &str, data: &[u8], options: &IngestOptions) {
        let mut archive = match ZipArchive::new(Cursor::new(data)) {
            Ok(archive) => archive,
            Err(e) => {
                self.push(Diagnostic::new(name, DiagnosticKind::ArchiveRead, format!("could not read file: {}", e)));
                return;
            }
        };

        let mut found_xml = false;
        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    self.push(Diagnostic::new(
                        format!("{}:#{}", name, i),
                        DiagnosticKind::ArchiveRead,
                        format!("could not read file: {}", e),
                    ));
                    continue;
                }
            };
            if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(".xml") {
                continue;
            }
            found_xml = true;

            let source = format!("{}:{}", name, entry.name());
            if entry.size() > options.max_entry_bytes {
                self.push(Diagnostic::new(
                    source,
                    DiagnosticKind::ArchiveRead,
                    format!("entry exceeds {} bytes", options.max_entry_bytes),
                ));
                continue;
            }

            // the declared size is not trusted: read at most one byte past the cap
            let mut xml = Vec::with_capacity(entry.size() as usize);
            let read = entry.by_ref().take(options.max_entry_bytes + 1).read_to_end(&mut xml);
            match read {
                Ok(n) if n as u64 > options.max_entry_bytes => self.push(Diagnostic::new(
                    source,
                    DiagnosticKind::ArchiveRead,
                    format!("entry exceeds {} bytes", options.max_entry_bytes),
                )),
                Ok(_) => self.add_document(source, &xml),
                Err(e) => self.push(Diagnostic::new(
                    source,
                    DiagnosticKind::ArchiveRead,
                    format!("could not read file: {}", e),
                )),
            }
        }

        if !found_xml {
            self.push(Diagnostic::new(name, DiagnosticKind::ArchiveRead, "zip has no .xml entries"));
        }
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        warn!(source = %diagnostic.source, kind = %diagnostic.kind, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }
}

/// Ingest a batch with default options.
pub fn ingest<'a, I>(files: I) -> IngestReport
where
    I: IntoIterator,
    I::Item: Into<UploadedFile<'a>>,
{
    ingest_with(files, &IngestOptions::default())
}

/// Ingest a batch: ZIP archives are expanded, every other file is read as one document.
pub fn ingest_with<'a, I>(files: I, options: &IngestOptions) -> IngestReport
where
    I: IntoIterator,
    I::Item: Into<UploadedFile<'a>>,
{
    let mut report = IngestReport::default();
    let mut file_count = 0usize;

    for file in files {
        let file = file.into();
        file_count += 1;
        if file.name.to_ascii_lowercase().ends_with(".zip") {
            report.add_archive(file.name, file.data, options);
        } else {
            report.add_document(file.name.to_string(), file.data);
        }
    }

    info!(
        files = file_count,
        records = report.records.len(),
        diagnostics = report.diagnostics.len(),
        "ingested batch"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const TAXED: &[u8] = b"<NFe><infNFe><ide><nNF>5</nNF></ide><det><prod><xProd>A</xProd></prod><imposto><IBSCBS><vBC>10</vBC></IBSCBS></imposto></det></infNFe></NFe>";
    const UNTAXED: &[u8] = b"<NFe><infNFe><det><imposto><ICMS/></imposto></det></infNFe></NFe>";

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn plain_files_and_diagnostics() {
        let report = ingest([
            ("a.xml", TAXED),
            ("b.xml", UNTAXED),
            ("c.xml", b"<NFe>".as_slice()),
        ]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].source_file, "a.xml");
        let kinds: Vec<_> = report.diagnostics.iter().map(|d| (d.source.as_str(), d.kind)).collect();
        assert_eq!(
            kinds,
            vec![("b.xml", DiagnosticKind::NoTaxableItems), ("c.xml", DiagnosticKind::MalformedDocument)]
        );
        assert_eq!(report.diagnostics[0].message, "no items with IBSCBS found");
        assert!(report.diagnostics[1].message.starts_with("could not read file"));
    }

    #[test]
    fn archive_entries_are_named_after_the_archive() {
        let archive = zip_of(&[("notas/1.XML", TAXED), ("leia-me.txt", &b"x"[..]), ("2.xml", UNTAXED)]);
        let report = ingest([("lote.ZIP", archive.as_slice())]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].source_file, "lote.ZIP:notas/1.XML");
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].source, "lote.ZIP:2.xml");
        assert_eq!(report.diagnostics[0].to_string(), "lote.ZIP:2.xml: no items with IBSCBS found");
    }

    #[test]
    fn archive_without_xml() {
        let archive = zip_of(&[("a.txt", &b"x"[..])]);
        let report = ingest([("lote.zip", archive.as_slice())]);
        assert!(report.records.is_empty());
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::new("lote.zip", DiagnosticKind::ArchiveRead, "zip has no .xml entries")]
        );
    }

    #[test]
    fn corrupt_archive_does_not_stop_the_batch() {
        let report = ingest([("bad.zip", b"PK\x03\x04garbage".as_slice()), ("a.xml", TAXED)]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::ArchiveRead);
        assert_eq!(report.diagnostics[0].source, "bad.zip");
    }

    #[test]
    fn oversized_entries_are_not_inflated() {
        let archive = zip_of(&[("big.xml", TAXED)]);
        let options = IngestOptions::new().with_max_entry_bytes(16);
        let report = ingest_with([("lote.zip", archive.as_slice())], &options);
        assert!(report.records.is_empty());
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::ArchiveRead);
        assert_eq!(report.diagnostics[0].message, "entry exceeds 16 bytes");
    }
}
