//! CLI output formatting for a pipeline run.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every page leads with
//! its page number and label; the source file is shown as secondary context
//! on an indented `Source:` line. Untitled pages show the file name in
//! parentheses instead, since the file name is then their only identity.
//!
//! # Output Format
//!
//! ## Records
//!
//! ```text
//! Ms1990_025_001 (3 pages)
//!     Prefix: iiif/Ms1990_025/box1
//!     001 Letters to the Board
//!         Source: obj_001.tif
//!         Correspondence, 1911-1914
//!     002 Letters to the Board
//!         Source: obj_002.tif
//!     Skipped: finding-aid.pdf
//! ```
//!
//! ## Render
//!
//! ```text
//!     001 Letters to the Board
//!         Source: /scans/Ms1990_025/box1/Ms1990_025_001/images/obj_001.tif
//!         access: 1200x900, 6 tiles
//!         reference: 600x450, 2 tiles
//!     002 FAILED (obj_002.tif)
//!         Source: /scans/Ms1990_025/box1/Ms1990_025_001/images/obj_002.tif
//!         Error: Backend error: Processing failed: ...
//! ```
//!
//! ## Summary
//!
//! ```text
//! Rendered 2 of 3 pages (1 failed)
//! Manifest: tmp/iiif/Ms1990_025/box1/Ms1990_025_001/manifest.json
//! Uploaded 214 files (3.2 MB) to s3://special-collections
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::naming::ObjectLocation;
use crate::pipeline::RunSummary;
use crate::process::ProcessEvent;
use crate::types::PageRecord;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Format a page line: titled pages show title, untitled show filename in parens.
///
/// ```text
/// 001 Letters to the Board   // titled
/// 001 (obj_001.tif)          // untitled
/// ```
fn page_line(page: u32, title: Option<&str>, filename: &str) -> String {
    match title {
        Some(t) if !t.is_empty() => format!("{} {}", format_index(page as usize), t),
        _ => format!("{} ({})", format_index(page as usize), filename),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

// ============================================================================
// Records
// ============================================================================

/// Format the page records built for one object.
pub fn format_records(
    location: &ObjectLocation,
    records: &[PageRecord],
    skipped: &[PathBuf],
) -> Vec<String> {
    let mut lines = Vec::new();
    let noun = if records.len() == 1 { "page" } else { "pages" };
    lines.push(format!("{} ({} {})", location.object_id, records.len(), noun));
    lines.push(format!("    Prefix: {}", location.prefix));

    for record in records {
        let filename = record.file_name();
        lines.push(format!(
            "    {}",
            page_line(record.page_number, record.label.as_deref(), &filename)
        ));
        if record.label.is_some() {
            lines.push(format!("        Source: {}", filename));
        }
        // Description is per document; show it once
        if record.is_master {
            if let Some(desc) = &record.description {
                let truncated = truncate_desc(desc.trim(), 60);
                if !truncated.is_empty() {
                    lines.push(format!("        {}", truncated));
                }
            }
        }
    }

    for path in skipped {
        lines.push(format!("    Skipped: {}", file_name(path)));
    }
    lines
}

/// Print records to stdout.
pub fn print_records(location: &ObjectLocation, records: &[PageRecord], skipped: &[PathBuf]) {
    for line in format_records(location, records, skipped) {
        println!("{}", line);
    }
}

// ============================================================================
// Render progress
// ============================================================================

/// Format a single render progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::ImageProcessed {
            page_number,
            title,
            source_path,
            variants,
        } => {
            let mut lines = Vec::new();
            let filename = file_name(Path::new(source_path));
            lines.push(format!(
                "    {}",
                page_line(*page_number, title.as_deref(), &filename)
            ));
            lines.push(format!("        Source: {}", source_path));
            for variant in variants {
                let noun = if variant.tile_count == 1 { "tile" } else { "tiles" };
                lines.push(format!(
                    "        {}: {}x{}, {} {}",
                    variant.label, variant.width, variant.height, variant.tile_count, noun
                ));
            }
            lines
        }
        ProcessEvent::ImageFailed {
            page_number,
            source_path,
            error,
        } => {
            let filename = file_name(Path::new(source_path));
            vec![
                format!(
                    "    {} FAILED ({})",
                    format_index(*page_number as usize),
                    filename
                ),
                format!("        Source: {}", source_path),
                format!("        Error: {}", error),
            ]
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run summary.
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let total = summary.records.len();
    if summary.failures.is_empty() {
        lines.push(format!("Rendered {} of {} pages", summary.rendered, total));
    } else {
        lines.push(format!(
            "Rendered {} of {} pages ({} failed)",
            summary.rendered,
            total,
            summary.failures.len()
        ));
    }
    lines.push(format!("Manifest: {}", summary.manifest_path.display()));
    if let Some(upload) = &summary.upload {
        lines.push(format!(
            "Uploaded {} files ({}) to s3://{}",
            upload.files,
            format_bytes(upload.bytes),
            upload.bucket
        ));
    }
    lines
}

/// Print the summary to stdout.
pub fn print_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
