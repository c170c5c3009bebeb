//! Image processing — tile geometry plus a pure-Rust pixel backend.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Variant rendition** | Lanczos3 resize → JPEG |
//! | **Tile** | crop at source resolution, Lanczos3 resize → JPEG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for tile geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    GeometryError, Tile, level0_scale_factors, scale_factor, scaled_dimensions, tiles_for,
};
pub use operations::{
    ImagingError, RenderedThumbnail, RenderedVariant, ThumbnailConfig, TileConfig,
    create_thumbnail, create_variant, get_dimensions, image_directory,
};
pub use params::Quality;
pub use rust_backend::RustBackend;
