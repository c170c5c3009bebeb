//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what files to create) and the [`backend`](super::backend)
//! (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeParams`] — a whole-image resize, used for thumbnails.
//! - [`TileJob`] — one tile: crop rectangle in source pixels, output size, output path.
//! - [`VariantParams`] — the full rendition and every tile of one (image, variant)
//!   pair, rendered from a single decode of the source.

use super::calculations::Tile;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a whole-image resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// A single tile to crop from the source and resize.
#[derive(Debug, Clone, PartialEq)]
pub struct TileJob {
    pub tile: Tile,
    pub output: PathBuf,
}

/// One (image, variant) pair: the full-size rendition plus all of its tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantParams {
    pub source: PathBuf,
    /// Full rendition output path and exact size.
    pub full_output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileJob>,
    pub quality: Quality,
}
