//! Source image discovery.
//!
//! Lists one object's image folder (non-recursively) and sorts the page
//! images into page order.
//!
//! ## Ordering
//!
//! Page order is the byte-wise lexicographic order of the full path string.
//! Numeric suffixes are *not* interpreted: without zero-padding, `page_10`
//! sorts before `page_2`. Existing published manifests depend on this order,
//! so it is kept as-is; scan folders should use zero-padded names
//! (`obj_001.tif`).
//!
//! ## Filtering
//!
//! Only files whose extension (case-insensitive, with leading dot) is in
//! `image_types` become pages. Files matching `document_file_types` are
//! reported as skipped; anything else (sidecars, `Thumbs.db`) is ignored.

use crate::config::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image folder not found: {0}")]
    FolderNotFound(PathBuf),
}

/// Files found in an image folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFiles {
    /// Page images in page order.
    pub images: Vec<PathBuf>,
    /// Document files (e.g. PDFs), not processed.
    pub documents: Vec<PathBuf>,
}

/// Check a file extension against a list like `[".jpg", ".tif"]`.
pub fn has_extension(path: &Path, allowed: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    allowed
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Sort paths byte-wise by their full path string.
pub fn sort_lexicographic(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}

/// List and sort the page images of one object.
pub fn scan_images(folder: &Path, config: &PipelineConfig) -> Result<ScannedFiles, ScanError> {
    if !folder.is_dir() {
        return Err(ScanError::FolderNotFound(folder.to_path_buf()));
    }

    let entries = fs::read_dir(folder).map_err(|source| ScanError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut scanned = ScannedFiles::default();
    for entry in entries {
        let path = entry
            .map_err(|source| ScanError::Io {
                path: folder.to_path_buf(),
                source,
            })?
            .path();
        if !path.is_file() {
            continue;
        }
        if has_extension(&path, &config.image_types) {
            scanned.images.push(path);
        } else if has_extension(&path, &config.document_file_types) {
            scanned.documents.push(path);
        }
    }

    sort_lexicographic(&mut scanned.images);
    sort_lexicographic(&mut scanned.documents);
    Ok(scanned)
}
