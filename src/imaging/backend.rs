//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, resize, and render_variant (full rendition plus tiles
//! cropped at source resolution, then resized).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::{ResizeParams, VariantParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize the whole image to exact dimensions.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Write the full rendition, then crop each tile from the original and
    /// resize it to the tile's output size.
    ///
    /// Implementations decode the source once for the whole variant.
    fn render_variant(&self, params: &VariantParams) -> Result<(), BackendError>;
}
