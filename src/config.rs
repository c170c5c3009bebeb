//! Pipeline configuration.
//!
//! Handles loading and validating an optional `config.toml`. Every field has
//! a default; the command line overrides a handful of them (base URL, output
//! directory, upload toggle, S3 target) before validation. The resulting
//! [`PipelineConfig`] is built once per run and passed by reference to every
//! stage.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = ""                   # Public base URL of the published tree (required, or -b)
//! output_dir = "tmp"              # Local output root
//! image_directory_name = "tiles"  # Directory holding per-image tile trees
//! tile_size = 512                 # Tile edge in variant pixels
//! thumbnail_size = 250            # Longer edge of the thumbnail
//! quality = 90                    # JPEG quality (1-100)
//! upload_to_s3 = false
//! image_types = [".jpg", ".tif", ".jpeg", ".tiff"]
//! document_file_types = [".pdf"]
//!
//! [variants]                      # name = longer edge in pixels
//! reference = 600
//! access = 1200
//!
//! [metadata]
//! timeout_secs = 30               # Bound on fetching a remote metadata sheet
//!
//! [processing]
//! max_processes = 4               # Max parallel workers (omit for auto = CPU cores)
//!
//! [s3]
//! bucket = ""
//! region = "us-east-1"
//! endpoint = ""                   # Custom endpoint (MinIO etc.), path-style addressing
//! key_prefix = ""                 # Prepended to every object key
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Public base URL that `@id`s in `info.json` and manifests are built on.
    pub base_url: String,
    /// Local output root; the object prefix is created beneath it.
    pub output_dir: PathBuf,
    /// Directory (under the prefix) holding one tile tree per image.
    pub image_directory_name: String,
    /// Named renditions: variant name → longer edge in pixels.
    pub variants: BTreeMap<String, u32>,
    /// Tile edge length in variant (scaled) pixels.
    pub tile_size: u32,
    /// Longer edge of the thumbnail rendition.
    pub thumbnail_size: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Publish the output tree to S3 after rendering.
    pub upload_to_s3: bool,
    /// Extensions (with leading dot) treated as page images.
    pub image_types: Vec<String>,
    /// Extensions reserved for document mode; recognised and skipped.
    pub document_file_types: Vec<String>,
    /// Metadata sheet fetching.
    pub metadata: MetadataConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// S3 publishing target.
    pub s3: S3Config,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            output_dir: PathBuf::from("tmp"),
            image_directory_name: "tiles".to_string(),
            variants: BTreeMap::from([
                ("reference".to_string(), 600),
                ("access".to_string(), 1200),
            ]),
            tile_size: 512,
            thumbnail_size: 250,
            quality: 90,
            upload_to_s3: false,
            image_types: [".jpg", ".tif", ".jpeg", ".tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            document_file_types: vec![".pdf".to_string()],
            metadata: MetadataConfig::default(),
            processing: ProcessingConfig::default(),
            s3: S3Config::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "base_url is required (set it in config.toml or pass --base-path)".into(),
            ));
        }
        if self.variants.is_empty() {
            return Err(ConfigError::Validation("variants must not be empty".into()));
        }
        if let Some((name, _)) = self.variants.iter().find(|(_, edge)| **edge == 0) {
            return Err(ConfigError::Validation(format!(
                "variants.{name} must be non-zero"
            )));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::Validation("tile_size must be non-zero".into()));
        }
        if self.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "thumbnail_size must be non-zero".into(),
            ));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.image_types.is_empty() {
            return Err(ConfigError::Validation(
                "image_types must not be empty".into(),
            ));
        }
        if self.image_directory_name.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "image_directory_name must not be empty".into(),
            ));
        }
        if self.upload_to_s3 && self.s3.bucket.is_empty() {
            return Err(ConfigError::Validation(
                "s3.bucket is required when upload_to_s3 is set".into(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Variant edges in name order.
    pub fn variant_edges(&self) -> Vec<u32> {
        self.variants.values().copied().collect()
    }
}

/// Metadata sheet fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Timeout for fetching a remote metadata sheet, in seconds.
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// S3 publishing target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; empty for AWS.
    pub endpoint: String,
    /// Prepended verbatim to every object key.
    pub key_prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: String::new(),
            key_prefix: String::new(),
        }
    }
}

impl S3Config {
    pub fn endpoint(&self) -> Option<&str> {
        Some(self.endpoint.as_str()).filter(|e| !e.is_empty())
    }
}

/// Load configuration from a TOML file, or defaults when `path` is `None`.
///
/// The result is not validated: command-line overrides are applied first,
/// then the caller runs [`PipelineConfig::validate`].
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# iiif-pyramid configuration
# ==========================
# All options are optional. Values shown are the defaults.

# Public base URL of the published tree. Every @id in info.json and
# manifest.json is built on it. Required here or via --base-path.
base_url = ""

# Local output root. Tiles and manifests are written beneath
# <output_dir>/<root folder>/<collection path>/.
output_dir = "tmp"

# Directory (under the prefix) holding one tile tree per page image.
image_directory_name = "tiles"

# Tile edge length, in pixels of the variant being tiled.
tile_size = 512

# Longer edge of the thumbnail rendition.
thumbnail_size = 250

# JPEG quality (1-100).
quality = 90

# Publish the output tree to S3 after rendering (also: --upload-to-s3).
upload_to_s3 = false

# File extensions treated as page images, compared case-insensitively.
image_types = [".jpg", ".tif", ".jpeg", ".tiff"]

# Extensions reserved for document mode. Recognised and skipped.
document_file_types = [".pdf"]

# ---------------------------------------------------------------------------
# Variants: named renditions, value = longer edge in pixels.
# Each variant gets a full-size rendition and its own tile grid.
# ---------------------------------------------------------------------------
[variants]
reference = 600
access = 1200

[metadata]
# Seconds to wait for a remote metadata sheet before giving up.
timeout_secs = 30

[processing]
# Maximum parallel image workers. Omit to use all CPU cores.
# max_processes = 4

[s3]
bucket = ""
region = "us-east-1"
# Custom endpoint for S3-compatible stores (uses path-style addressing).
endpoint = ""
# Prepended to every object key.
key_prefix = ""
"##
}
