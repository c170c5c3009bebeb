//! Identifier and prefix derivation from input paths.
//!
//! A run is described by two paths the archive already has: the metadata
//! sheet, whose file name carries the collection id, and the folder of page
//! images for one object inside that collection:
//!
//! ```text
//! sheet:  …/Ms1990_025_metadata.csv        → collection  Ms1990_025
//! images: /scans/Ms1990_025/box1/Ms1990_025_003/images/
//!                └──────── input folder ─────────────┘
//!         object id   = Ms1990_025_003     (second-to-last component)
//!         prefix      = <root>/Ms1990_025/box1
//! ```
//!
//! The prefix mirrors the collection's layout under the root folder, and
//! every output path and public URL is built beneath it.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static COLLECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ms\d{4}_\d{3}").expect("collection id pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("No collection id (e.g. Ms1990_025) in metadata file name: {0}")]
    NoCollectionId(String),
    #[error("Image folder {folder} is not inside collection {collection}")]
    FolderOutsideCollection { folder: String, collection: String },
    #[error("Image folder {0} must end with <object id>/<image directory>")]
    FolderTooShallow(String),
}

/// Where one object's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Collection id from the sheet name, e.g. `Ms1990_025`.
    pub collection_id: String,
    /// Document id shared by every page record.
    pub object_id: String,
    /// Output prefix, `/`-separated, no leading or trailing slash.
    pub prefix: String,
}

/// Extract the collection id from a metadata file name.
pub fn collection_id(sheet_name: &str) -> Option<&str> {
    COLLECTION_ID.find(sheet_name).map(|m| m.as_str())
}

/// Join path segments with single slashes, dropping empty segments.
pub fn join_prefix<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive collection id, object id and output prefix for a run.
pub fn locate_object(
    sheet_name: &str,
    image_folder: &Path,
    root_folder: &str,
) -> Result<ObjectLocation, LocateError> {
    let collection = collection_id(sheet_name)
        .ok_or_else(|| LocateError::NoCollectionId(sheet_name.to_string()))?;

    let folder = image_folder.to_string_lossy().replace('\\', "/");
    let start = folder
        .find(collection)
        .ok_or_else(|| LocateError::FolderOutsideCollection {
            folder: folder.clone(),
            collection: collection.to_string(),
        })?;

    let components: Vec<&str> = folder[start..]
        .split('/')
        .filter(|seg| !seg.is_empty())
        .collect();
    if components.len() < 2 {
        return Err(LocateError::FolderTooShallow(folder.clone()));
    }

    let object_id = components[components.len() - 2].to_string();
    let parents = &components[..components.len() - 2];
    let prefix = join_prefix(std::iter::once(root_folder).chain(parents.iter().copied()));

    Ok(ObjectLocation {
        collection_id: collection.to_string(),
        object_id,
        prefix,
    })
}
