//! # iiif-pyramid
//!
//! Turns a folder of archival page scans plus a CSV metadata sheet into a
//! static IIIF tile pyramid and Presentation manifest, optionally published
//! to S3. The filesystem is the input: the sheet's name carries the
//! collection id, the image folder's position inside the collection gives
//! the object id and the output prefix.
//!
//! # Architecture: One Run, Six Steps
//!
//! A run processes one object (one folder of page images):
//!
//! ```text
//! sheet name + folder  →  ObjectLocation    (naming)
//! folder               →  sorted pages      (scan)
//! pages + sheet        →  PageRecords       (metadata, records)
//! PageRecords          →  tiles, info.json  (process, imaging)
//! rendered pages       →  manifest.json     (iiif)
//! output tree          →  s3://bucket/...   (upload)
//! ```
//!
//! [`pipeline`] drives the steps in order. Each step is a plain function
//! over plain data, so tests exercise it without the others:
//!
//! - **Geometry** is pure: [`imaging::tiles_for`] is a function of four
//!   integers.
//! - **Pixels** go through the [`imaging::ImageBackend`] trait; tests swap in
//!   a recording mock, so rendering logic is checked without decoding JPEGs.
//! - **Metadata** lookups are a pure scan over a parsed table.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrates one run; output layout; run summary |
//! | [`naming`] | Collection id, object id and output prefix from input paths |
//! | [`scan`] | Lists and orders page images in an object folder |
//! | [`metadata`] | CSV sheet loading (file or URL), identifier lookup |
//! | [`records`] | Binds ordered page images to document metadata |
//! | [`process`] | Parallel rendering of variants, tiles, thumbnails, `info.json` |
//! | [`imaging`] | Tile geometry and the pure-Rust pixel backend |
//! | [`iiif`] | `info.json` and Presentation 2.1 manifest documents, URLs |
//! | [`upload`] | Publishes the output tree to S3 |
//! | [`config`] | `config.toml` loading and validation |
//! | [`types`] | Shared record types serialized to `records.json` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Crop at Source Resolution
//!
//! Tiles are cut from the full-resolution original and only then resized,
//! never cut from an already-downscaled rendition. Grid lines are laid out in
//! the variant's pixel space and mapped back to source pixels once, so
//! adjacent tiles share their boundary exactly in both spaces.
//!
//! ## Static Level 0 Output
//!
//! Every URL in `info.json` and the manifest is a file on disk, named with
//! the Image API URI template (`{region}/{size}/0/default.jpg`). The tree can
//! be served from any bucket or file server; no image server is involved.
//! `info.json` advertises a tile scale factor only when the tiles a client
//! would compute for it are exactly the ones written; otherwise it lists
//! `sizes` alone.
//!
//! ## Metadata Fails Soft
//!
//! A missing sheet, a missing `Identifier` column or an unknown id leaves
//! labels empty and logs a warning. Pages still render; the manifest label
//! falls back to the object id.
//!
//! ## Plain Lexicographic Page Order
//!
//! Page numbers follow the byte-wise sort of file paths. Scans are expected
//! to use zero-padded names; `page_10` sorts before `page_2`.

pub mod config;
pub mod iiif;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod records;
pub mod scan;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
