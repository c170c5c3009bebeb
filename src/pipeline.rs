//! One run of the pipeline for one object.
//!
//! ```text
//! 1. validate config            fatal, before any file I/O
//! 2. locate object              sheet name + image folder → id, prefix
//! 3. create output directories  idempotent
//! 4. scan image folder          sorted page images
//! 5. open metadata, build records
//! 6. write records.json
//! 7. render tiles + info.json   parallel, per-page failures collected
//! 8. write manifest.json        page order
//! 9. upload to S3               when enabled
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! {output_dir}/{prefix}/
//! ├── Ms1990_025_metadata.csv          # copy of the sheet used
//! ├── Ms1990_025_001/
//! │   ├── manifest.json
//! │   └── records.json
//! └── tiles/
//!     ├── Ms1990_025_001-1/
//!     └── Ms1990_025_001-2/
//! ```

use crate::config::{ConfigError, PipelineConfig};
use crate::iiif::{CanvasSource, UrlBuilder, build_manifest, write_json};
use crate::imaging::rust_backend::supported_input_extensions;
use crate::imaging::{ImageBackend, RustBackend};
use crate::metadata::{MetadataIndex, MetadataSource};
use crate::naming::{LocateError, ObjectLocation, locate_object};
use crate::process::{
    ImageFailure, ProcessConfig, ProcessError, ProcessEvent, process_with_backend,
};
use crate::records::build_records;
use crate::scan::{ScanError, scan_images};
use crate::types::PageRecord;
use crate::upload::{UploadError, UploadSummary, upload_tree};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to process: one object's image folder plus its collection's sheet.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub metadata: MetadataSource,
    pub image_folder: PathBuf,
    /// Leading path of every output prefix and object key.
    pub root_folder: String,
}

/// Local paths for one object's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// `{output_dir}/{prefix}`: the tree that gets uploaded.
    pub prefix_dir: PathBuf,
    /// `{prefix_dir}/{object_id}`: manifest and records.
    pub object_dir: PathBuf,
    /// `{prefix_dir}/{image_directory_name}`: one directory per page image.
    pub tiles_root: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, location: &ObjectLocation, image_directory_name: &str) -> Self {
        let prefix_dir = location
            .prefix
            .split('/')
            .filter(|seg| !seg.is_empty())
            .fold(output_dir.to_path_buf(), |dir, seg| dir.join(seg));
        Self {
            object_dir: prefix_dir.join(&location.object_id),
            tiles_root: prefix_dir.join(image_directory_name.trim_matches('/')),
            prefix_dir,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.object_dir.join("manifest.json")
    }

    pub fn records_path(&self) -> PathBuf {
        self.object_dir.join("records.json")
    }

    /// Create every directory the run writes into. Safe to call repeatedly.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.object_dir)?;
        std::fs::create_dir_all(&self.tiles_root)
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunSummary {
    pub location: ObjectLocation,
    pub layout: OutputLayout,
    /// Every record built, in page order, rendered or not.
    pub records: Vec<PageRecord>,
    /// Document files found next to the images and not processed.
    pub skipped_documents: Vec<PathBuf>,
    /// Number of pages rendered successfully.
    pub rendered: usize,
    pub failures: Vec<ImageFailure>,
    pub manifest_path: PathBuf,
    pub upload: Option<UploadSummary>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the pipeline with the pure-Rust imaging backend.
pub fn run(
    job: &JobSpec,
    config: &PipelineConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, PipelineError> {
    let backend = RustBackend::new();
    run_with_backend(&backend, job, config, events)
}

/// Run the pipeline using a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    job: &JobSpec,
    config: &PipelineConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    for ext in &config.image_types {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if !supported_input_extensions().iter().any(|known| *known == ext) {
            warn!("No decoder for .{} images; they will fail to render", ext);
        }
    }

    let sheet_name = job.metadata.file_name().unwrap_or_default();
    let location = locate_object(&sheet_name, &job.image_folder, &job.root_folder)?;
    info!(
        "Object {} in collection {} → {}",
        location.object_id, location.collection_id, location.prefix
    );

    let layout = OutputLayout::new(&config.output_dir, &location, &config.image_directory_name);
    layout.create_dirs()?;

    let scanned = scan_images(&job.image_folder, config)?;
    if scanned.images.is_empty() {
        warn!("No page images found in {}", job.image_folder.display());
    }
    for document in &scanned.documents {
        info!("Skipping document {}", document.display());
    }

    let index = MetadataIndex::open(&job.metadata, &config.metadata);
    if let Some(copy) = index.save_copy(&layout.prefix_dir)? {
        info!("Saved metadata copy to {}", copy.display());
    }
    let records = build_records(&scanned.images, &location.object_id, &index);
    write_json(&layout.records_path(), &records)?;
    info!("Built {} page records", records.len());

    let urls = UrlBuilder::new(
        config.base_url(),
        &location.prefix,
        &config.image_directory_name,
    );
    let processed = process_with_backend(
        backend,
        &records,
        &layout.tiles_root,
        &urls,
        &ProcessConfig::from_pipeline_config(config),
        events,
    )?;

    let pages: Vec<CanvasSource<'_>> = processed
        .images
        .iter()
        .map(|image| CanvasSource {
            record: &image.record,
            width: image.width,
            height: image.height,
            variants: &image.variants,
            thumbnail: &image.thumbnail,
        })
        .collect();
    let manifest = build_manifest(&location.object_id, &pages, &urls);
    let manifest_path = layout.manifest_path();
    write_json(&manifest_path, &manifest)?;
    info!("Wrote manifest {}", manifest_path.display());

    let upload = if config.upload_to_s3 {
        Some(upload_tree(&layout.prefix_dir, &location.prefix, &config.s3)?)
    } else {
        None
    };

    Ok(RunSummary {
        rendered: processed.images.len(),
        failures: processed.failures,
        location,
        layout,
        records,
        skipped_documents: scanned.documents,
        manifest_path,
        upload,
    })
}
