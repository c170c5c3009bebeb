//! Publishing the output tree to S3.
//!
//! Every file under `{output_dir}/{prefix}` is uploaded to
//! `s3://{bucket}/{key_prefix}{prefix}/{relative path}`, so the public URLs
//! in `info.json` and `manifest.json` resolve once the bucket is served at
//! `base_url`.
//!
//! The pipeline is synchronous; uploads run on a runtime owned by
//! [`upload_tree`] for the duration of the call.

use crate::config::S3Config;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
    #[error("Failed to upload s3://{bucket}/{key}: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Counts from one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub bucket: String,
    pub files: usize,
    pub bytes: u64,
}

/// Create an S3 client with optional custom endpoint.
///
/// A custom endpoint (MinIO, LocalStack) switches to path-style addressing.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}

/// MIME type for an output file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => "application/json",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Object key for a file at `relative` (a path under the prefix directory).
pub fn object_key(key_prefix: &str, prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let path = [prefix, relative.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    format!("{}{}", key_prefix, path)
}

/// Every file under `root`, sorted, as (absolute, relative) pairs.
pub fn collect_files(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>, UploadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| UploadError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| UploadError::Walk {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?
            .to_path_buf();
        files.push((entry.into_path(), relative));
    }
    Ok(files)
}

/// Upload the tree at `local_root` under `prefix`.
pub fn upload_tree(
    local_root: &Path,
    prefix: &str,
    config: &S3Config,
) -> Result<UploadSummary, UploadError> {
    let files = collect_files(local_root)?;
    info!(
        "Uploading {} files to s3://{}/{}{}",
        files.len(),
        config.bucket,
        config.key_prefix,
        prefix
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(put_files(&files, prefix, config))
}

async fn put_files(
    files: &[(PathBuf, PathBuf)],
    prefix: &str,
    config: &S3Config,
) -> Result<UploadSummary, UploadError> {
    let client = create_s3_client(config.endpoint(), &config.region).await;
    let mut summary = UploadSummary {
        bucket: config.bucket.clone(),
        ..UploadSummary::default()
    };

    for (path, relative) in files {
        let key = object_key(&config.key_prefix, prefix, relative);
        let bytes = std::fs::read(path)?;
        let len = bytes.len() as u64;

        client
            .put_object()
            .bucket(&config.bucket)
            .key(&key)
            .content_type(content_type(path))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| UploadError::Put {
                bucket: config.bucket.clone(),
                key: key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!("Uploaded {}", key);
        summary.files += 1;
        summary.bytes += len;
    }

    Ok(summary)
}
