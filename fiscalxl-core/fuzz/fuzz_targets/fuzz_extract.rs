#![no_main]

//! Fuzz target for invoice extraction.
//!
//! Arbitrary bytes go through the element-tree parser and the extractor.
//! Neither may panic, and every record must come from a detail carrying an
//! IBSCBS block, so `value_source` is either empty or the vBC marker.

use libfuzzer_sys::fuzz_target;
use fiscalxl_core::{extract, extract_document, ingest, VALUE_SOURCE_TAG};

fuzz_target!(|data: &[u8]| {
    let items = extract(data, "fuzz.xml");
    for item in &items {
        assert_eq!(item.source_file, "fuzz.xml");
        assert!(item.value_source.is_empty() || item.value_source == VALUE_SOURCE_TAG);
        assert_eq!(item.value_source.is_empty(), item.base_value.is_none());
    }

    match extract_document(data, "fuzz.xml") {
        Ok(found) => assert_eq!(found, items),
        Err(_) => assert!(items.is_empty()),
    }

    // the same bytes as an upload, once as a document and once as an archive
    let report = ingest([("fuzz.xml", data), ("fuzz.zip", data)]);
    assert!(report.records.len() >= items.len());
});
