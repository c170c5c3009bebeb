//! Shared test utilities for the iiif-pyramid test suite.
//!
//! Provides synthetic image and metadata fixtures laid out the way an archive
//! delivers them, plus JSON readers for asserting on written output.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let fixture = setup_collection(tmp.path(), &[(400, 300), (300, 400)]);
//!
//! let files = scan_images(&fixture.image_folder, &config).unwrap();
//! assert_eq!(files.images.len(), 2);
//! ```

use image::{ImageEncoder, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const COLLECTION_ID: &str = "Ms1990_025";
pub const OBJECT_ID: &str = "Ms1990_025_001";

/// Metadata sheet with one row for [`OBJECT_ID`].
pub const SHEET: &str = "Identifier,Title,Description\n\
    Ms1990_025_001,\"Letters to the Board\",\"Correspondence, 1911-1914\"\n";

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a gradient JPEG of the given size, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let file = fs::File::create(path).unwrap();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 85);
    encoder
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a CSV file and return its path.
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Paths of a synthetic collection on disk.
pub struct CollectionFixture {
    /// `<root>/Ms1990_025_metadata.csv`
    pub sheet: PathBuf,
    /// `<root>/scans/Ms1990_025/Ms1990_025_001/images`
    pub image_folder: PathBuf,
    /// Page images in page order.
    pub pages: Vec<PathBuf>,
}

/// Lay out one object with a page image per entry in `sizes`.
///
/// Pages are written in reverse so directory order differs from page order.
pub fn setup_collection(root: &Path, sizes: &[(u32, u32)]) -> CollectionFixture {
    let sheet = write_csv(root, "Ms1990_025_metadata.csv", SHEET);
    let image_folder = root
        .join("scans")
        .join(COLLECTION_ID)
        .join(OBJECT_ID)
        .join("images");

    let pages: Vec<PathBuf> = (1..=sizes.len())
        .map(|n| image_folder.join(format!("obj_{:03}.jpg", n)))
        .collect();
    for (path, (w, h)) in pages.iter().zip(sizes).rev() {
        create_test_jpeg(path, *w, *h);
    }

    CollectionFixture {
        sheet,
        image_folder,
        pages,
    }
}

// =========================================================================
// Output readers
// =========================================================================

/// Parse a JSON file written by the pipeline. Panics with the path on failure.
pub fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

/// Relative paths of every file under `root`, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
