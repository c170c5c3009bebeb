//! Tile pyramid rendering.
//!
//! Takes the page records of one object and renders, per page, every variant
//! (full rendition plus tile grid), a thumbnail and the `info.json` that
//! describes them.
//!
//! ## Output Structure
//!
//! ```text
//! tiles/
//! ├── Ms1990_025_001-1/
//! │   ├── info.json
//! │   ├── full/1200,/0/default.jpg        # access rendition
//! │   ├── full/600,/0/default.jpg         # reference rendition
//! │   ├── full/250,/0/default.jpg         # thumbnail
//! │   ├── 0,0,1707,1707/512,/0/default.jpg
//! │   └── ...
//! └── Ms1990_025_001-2/
//! ```
//!
//! ## Parallel Processing
//!
//! Pages are processed in parallel using [rayon](https://docs.rs/rayon).
//! Results come back in record order regardless of completion order.
//!
//! ## Failures
//!
//! An image that cannot be decoded, or whose geometry is degenerate, is a
//! per-page failure: it is reported as [`ProcessEvent::ImageFailed`],
//! collected in [`ProcessResult::failures`], and the rest of the batch
//! continues. Failing to create directories or write `info.json` aborts.

use crate::config::PipelineConfig;
use crate::iiif::{UrlBuilder, image_info, write_json};
use crate::imaging::{
    ImageBackend, ImagingError, Quality, RenderedThumbnail, RenderedVariant, RustBackend,
    ThumbnailConfig, TileConfig, create_thumbnail, create_variant, get_dimensions,
    image_directory, level0_scale_factors,
};
use crate::types::PageRecord;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendering settings derived from [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Variant name → longer edge, in name order.
    pub variants: Vec<(String, u32)>,
    pub tiles: TileConfig,
    pub thumbnail: ThumbnailConfig,
}

impl ProcessConfig {
    pub fn from_pipeline_config(config: &PipelineConfig) -> Self {
        let quality = Quality::new(config.quality);
        Self {
            variants: config
                .variants
                .iter()
                .map(|(name, edge)| (name.clone(), *edge))
                .collect(),
            tiles: TileConfig {
                tile_size: config.tile_size,
                quality,
            },
            thumbnail: ThumbnailConfig {
                size: config.thumbnail_size,
                quality,
            },
        }
    }

    fn variant_edges(&self) -> Vec<u32> {
        self.variants.iter().map(|(_, edge)| *edge).collect()
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_pipeline_config(&PipelineConfig::default())
    }
}

/// Per-variant summary for progress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub tile_count: usize,
}

/// Progress events emitted while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    ImageProcessed {
        page_number: u32,
        title: Option<String>,
        source_path: String,
        variants: Vec<VariantInfo>,
    },
    ImageFailed {
        page_number: u32,
        source_path: String,
        error: String,
    },
}

/// One successfully rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub record: PageRecord,
    /// Source dimensions.
    pub width: u32,
    pub height: u32,
    pub variants: Vec<RenderedVariant>,
    pub thumbnail: RenderedThumbnail,
    pub info_path: PathBuf,
}

/// A page that could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub page_number: u32,
    pub source_path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Rendered pages in page order.
    pub images: Vec<ProcessedImage>,
    /// Failed pages in page order.
    pub failures: Vec<ImageFailure>,
}

pub fn process(
    records: &[PageRecord],
    tiles_root: &Path,
    urls: &UrlBuilder,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, records, tiles_root, urls, config, events)
}

/// Process images using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    records: &[PageRecord],
    tiles_root: &Path,
    urls: &UrlBuilder,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    std::fs::create_dir_all(tiles_root)?;

    let outcomes: Vec<Result<Result<ProcessedImage, ImageFailure>, ProcessError>> = records
        .par_iter()
        .map(|record| {
            let outcome = process_record(backend, record, tiles_root, urls, config)?;
            if let Some(tx) = &events {
                tx.send(event_for(&outcome)).ok();
            }
            Ok(outcome)
        })
        .collect();

    let mut result = ProcessResult::default();
    for outcome in outcomes {
        match outcome? {
            Ok(image) => result.images.push(image),
            Err(failure) => result.failures.push(failure),
        }
    }
    Ok(result)
}

/// Render one page and write its `info.json`.
///
/// The inner `Err` is a per-page failure; the outer one aborts the batch.
fn process_record(
    backend: &impl ImageBackend,
    record: &PageRecord,
    tiles_root: &Path,
    urls: &UrlBuilder,
    config: &ProcessConfig,
) -> Result<Result<ProcessedImage, ImageFailure>, ProcessError> {
    let image_id = record.image_id();
    let image_dir = image_directory(tiles_root, &image_id);
    std::fs::create_dir_all(&image_dir)?;

    let rendered = match render_image(backend, record, &image_dir, config) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!("Failed to render {}: {}", record.path.display(), e);
            return Ok(Err(ImageFailure {
                page_number: record.page_number,
                source_path: record.path.clone(),
                error: e.to_string(),
            }));
        }
    };

    let (width, height, variants, thumbnail) = rendered;
    let renditions = variants
        .iter()
        .map(|v| (v.width, v.height))
        .chain(std::iter::once((thumbnail.width, thumbnail.height)));
    let info = image_info(
        urls.image_service(&image_id),
        (width, height),
        renditions,
        config.tiles.tile_size,
        level0_scale_factors((width, height), &config.variant_edges()),
    );
    let info_path = image_dir.join("info.json");
    write_json(&info_path, &info)?;
    debug!("Wrote {}", info_path.display());

    Ok(Ok(ProcessedImage {
        record: record.clone(),
        width,
        height,
        variants,
        thumbnail,
        info_path,
    }))
}

type Rendered = (u32, u32, Vec<RenderedVariant>, RenderedThumbnail);

fn render_image(
    backend: &impl ImageBackend,
    record: &PageRecord,
    image_dir: &Path,
    config: &ProcessConfig,
) -> Result<Rendered, ImagingError> {
    let source = &record.path;
    let dimensions = get_dimensions(backend, source)?;
    debug!(
        "{} is {}x{}",
        record.file_name(),
        dimensions.0,
        dimensions.1
    );

    let variants = config
        .variants
        .iter()
        .map(|(name, edge)| {
            create_variant(
                backend,
                source,
                image_dir,
                dimensions,
                name,
                *edge,
                &config.tiles,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let thumbnail = create_thumbnail(backend, source, image_dir, dimensions, &config.thumbnail)?;

    Ok((dimensions.0, dimensions.1, variants, thumbnail))
}

fn event_for(outcome: &Result<ProcessedImage, ImageFailure>) -> ProcessEvent {
    match outcome {
        Ok(image) => ProcessEvent::ImageProcessed {
            page_number: image.record.page_number,
            title: image.record.label.clone(),
            source_path: image.record.path.display().to_string(),
            variants: image
                .variants
                .iter()
                .map(|v| VariantInfo {
                    label: v.name.clone(),
                    width: v.width,
                    height: v.height,
                    tile_count: v.tile_count,
                })
                .collect(),
        },
        Err(failure) => ProcessEvent::ImageFailed {
            page_number: failure.page_number,
            source_path: failure.source_path.display().to_string(),
            error: failure.error.clone(),
        },
    }
}
