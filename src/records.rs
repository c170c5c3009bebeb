//! Page record assembly.
//!
//! Binds the sorted page images of one document to its metadata. Metadata
//! is per document: every page of `id` gets the same label and description.

use crate::metadata::MetadataIndex;
use crate::types::PageRecord;
use std::path::PathBuf;

/// Build one [`PageRecord`] per file, in the order given.
///
/// `files` must already be in page order (see [`crate::scan`]). The index is
/// consulted once per file with the same `id`.
pub fn build_records(files: &[PathBuf], id: &str, index: &MetadataIndex) -> Vec<PageRecord> {
    files
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let page_number = idx as u32 + 1;
            let metadata = index.lookup(id).unwrap_or_default();
            PageRecord {
                path: path.clone(),
                id: id.to_string(),
                label: metadata.title,
                description: metadata.description,
                page_number,
                is_master: page_number == 1,
                is_document: false,
                section: format!("p{}", page_number),
                section_label: format!("Page {}", page_number),
            }
        })
        .collect()
}
