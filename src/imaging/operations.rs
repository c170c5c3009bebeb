//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.
//!
//! Output paths follow the IIIF Image API URI template
//! `{region}/{size}/{rotation}/{quality}.{format}` relative to the image
//! directory, so the tree can be served statically as a level 0 service:
//!
//! ```text
//! Ms1990_025-1/
//! ├── info.json
//! ├── full/600,/0/default.jpg          # variant rendition (same decode as its tiles)
//! ├── full/250,/0/default.jpg          # thumbnail
//! └── 0,0,1707,1707/512,/0/default.jpg # tile: source region, output width
//! ```

use super::backend::{BackendError, ImageBackend};
use super::calculations::{GeometryError, Tile, scaled_dimensions, tiles_for};
use super::params::{Quality, ResizeParams, TileJob, VariantParams};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Relative path of a full-image rendition at `width`.
pub fn full_image_path(width: u32) -> String {
    format!("full/{},/0/default.jpg", width)
}

/// Relative path of a tile: source region, then output width.
pub fn tile_path(tile: &Tile) -> String {
    format!(
        "{},{},{},{}/{},/0/default.jpg",
        tile.x, tile.y, tile.width, tile.height, tile.x_size
    )
}

/// Configuration for tile rendering.
#[derive(Debug, Clone)]
pub struct TileConfig {
    pub tile_size: u32,
    pub quality: Quality,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: 512,
            quality: Quality::default(),
        }
    }
}

/// A variant rendered for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVariant {
    pub name: String,
    pub max_edge: u32,
    pub width: u32,
    pub height: u32,
    /// Path of the full rendition relative to the image directory.
    pub full_path: String,
    pub tile_count: usize,
}

/// Plan one variant (full rendition and tiles) without executing it.
pub fn plan_variant(
    source: &Path,
    image_dir: &Path,
    original_dims: (u32, u32),
    max_edge: u32,
    config: &TileConfig,
) -> std::result::Result<VariantParams, GeometryError> {
    let tiles = tiles_for(original_dims.0, original_dims.1, max_edge, config.tile_size)?;
    let (width, height) = scaled_dimensions(original_dims, max_edge);

    Ok(VariantParams {
        source: source.to_path_buf(),
        full_output: image_dir.join(full_image_path(width)),
        width,
        height,
        tiles: tiles
            .into_iter()
            .map(|tile| TileJob {
                output: image_dir.join(tile_path(&tile)),
                tile,
            })
            .collect(),
        quality: config.quality,
    })
}

/// Render one variant: the full-size rendition plus every tile, from one
/// decode of the source.
///
/// Geometry is validated before anything is written, so an invalid image
/// leaves no partial output for the variant.
pub fn create_variant(
    backend: &impl ImageBackend,
    source: &Path,
    image_dir: &Path,
    original_dims: (u32, u32),
    name: &str,
    max_edge: u32,
    config: &TileConfig,
) -> Result<RenderedVariant> {
    let params = plan_variant(source, image_dir, original_dims, max_edge, config)?;
    backend.render_variant(&params)?;

    Ok(RenderedVariant {
        name: name.to_string(),
        max_edge,
        width: params.width,
        height: params.height,
        full_path: full_image_path(params.width),
        tile_count: params.tiles.len(),
    })
}

/// Configuration for thumbnail generation.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Longer edge of the thumbnail.
    pub size: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 250,
            quality: Quality::default(),
        }
    }
}

/// A rendered thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedThumbnail {
    pub width: u32,
    pub height: u32,
    pub path: String,
}

/// Plan a thumbnail resize without executing it.
pub fn plan_thumbnail(
    source: &Path,
    image_dir: &Path,
    original_dims: (u32, u32),
    config: &ThumbnailConfig,
) -> ResizeParams {
    let (width, height) = scaled_dimensions(original_dims, config.size);
    ResizeParams {
        source: source.to_path_buf(),
        output: image_dir.join(full_image_path(width)),
        width,
        height,
        quality: config.quality,
    }
}

/// Create a thumbnail image.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    image_dir: &Path,
    original_dims: (u32, u32),
    config: &ThumbnailConfig,
) -> Result<RenderedThumbnail> {
    let params = plan_thumbnail(source, image_dir, original_dims, config);
    backend.resize(&params)?;

    Ok(RenderedThumbnail {
        width: params.width,
        height: params.height,
        path: full_image_path(params.width),
    })
}

/// Absolute path of the directory holding one image's tiles.
pub fn image_directory(tiles_root: &Path, image_id: &str) -> PathBuf {
    tiles_root.join(image_id)
}
