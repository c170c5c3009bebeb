//! Shared types used across pipeline stages.
//!
//! [`PageRecord`] is produced by the record builder, written to
//! `records.json` for inspection, and consumed by the renderer and the
//! manifest writer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Title and description resolved for one document from the metadata sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// One page image of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Source image on disk.
    pub path: PathBuf,
    /// Object identifier shared by every page of the document.
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// 1-based position in the sorted file list.
    pub page_number: u32,
    /// True only for page 1.
    pub is_master: bool,
    /// Reserved for document (PDF) mode; always false for page images.
    pub is_document: bool,
    /// `p<page_number>`
    pub section: String,
    /// `Page <page_number>`
    pub section_label: String,
}

impl PageRecord {
    /// Identifier of this page's image service: `<id>-<page_number>`.
    pub fn image_id(&self) -> String {
        format!("{}-{}", self.id, self.page_number)
    }

    /// File name of the source image, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
