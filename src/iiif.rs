//! IIIF `info.json` and manifest serialization.
//!
//! Output is a static, level 0 service: every URL the documents advertise
//! resolves to a file the renderer wrote. Only the fields viewers need are
//! produced.
//!
//! ## URLs
//!
//! ```text
//! image service  {base_url}/{prefix}/{image_directory_name}/{id}-{page}
//! manifest       {base_url}/{prefix}/{id}/manifest.json
//! canvas         {base_url}/{prefix}/{id}/canvas/p{page}
//! ```
//!
//! ## Manifest shape (Presentation API 2.1)
//!
//! ```text
//! sc:Manifest  label, description, thumbnail
//! ├── sequences[0]  sc:Sequence
//! │   └── canvases  one sc:Canvas per rendered page, page order
//! │       └── images[0]  oa:Annotation (sc:painting) → largest variant + service
//! └── structures    one sc:Range per page (section / section_label)
//! ```

use crate::imaging::{RenderedThumbnail, RenderedVariant};
use crate::naming::join_prefix;
use crate::types::PageRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGE_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
pub const IMAGE_PROTOCOL: &str = "http://iiif.io/api/image";
pub const LEVEL0_PROFILE: &str = "http://iiif.io/api/image/2/level0.json";
pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";

/// Builds every public URL for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base_url: String,
    prefix: String,
    image_directory_name: String,
}

impl UrlBuilder {
    pub fn new(base_url: &str, prefix: &str, image_directory_name: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            image_directory_name: image_directory_name.to_string(),
        }
    }

    fn url(&self, parts: &[&str]) -> String {
        let path = join_prefix(std::iter::once(self.prefix.as_str()).chain(parts.iter().copied()));
        format!("{}/{}", self.base_url, path)
    }

    /// Image service base; `info.json` lives directly beneath it.
    pub fn image_service(&self, image_id: &str) -> String {
        self.url(&[&self.image_directory_name, image_id])
    }

    fn object_base(&self, object_id: &str) -> String {
        self.url(&[object_id])
    }

    pub fn manifest(&self, object_id: &str) -> String {
        format!("{}/manifest.json", self.object_base(object_id))
    }

    pub fn sequence(&self, object_id: &str) -> String {
        format!("{}/sequence/normal", self.object_base(object_id))
    }

    pub fn canvas(&self, object_id: &str, section: &str) -> String {
        format!("{}/canvas/{}", self.object_base(object_id), section)
    }

    pub fn annotation(&self, object_id: &str, section: &str) -> String {
        format!("{}/annotation/{}", self.object_base(object_id), section)
    }

    pub fn range(&self, object_id: &str, section: &str) -> String {
        format!("{}/range/{}", self.object_base(object_id), section)
    }
}

// ============================================================================
// Image API: info.json
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub width: u32,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: String,
    pub width: u32,
    pub height: u32,
    pub profile: Vec<String>,
    pub sizes: Vec<Size>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileInfo>,
}

/// Describe one rendered image.
///
/// `sizes` lists every full rendition (variants and thumbnail), smallest
/// first, without duplicates. `tiles` is left out when `scale_factors` is
/// empty, leaving a sizes-only level 0 description.
pub fn image_info(
    service_id: String,
    source: (u32, u32),
    renditions: impl IntoIterator<Item = (u32, u32)>,
    tile_size: u32,
    scale_factors: Vec<u32>,
) -> ImageInfo {
    let mut sizes: Vec<Size> = renditions
        .into_iter()
        .map(|(width, height)| Size { width, height })
        .collect();
    sizes.sort();
    sizes.dedup();

    ImageInfo {
        context: IMAGE_CONTEXT.to_string(),
        id: service_id,
        protocol: IMAGE_PROTOCOL.to_string(),
        width: source.0,
        height: source.1,
        profile: vec![LEVEL0_PROFILE.to_string()],
        sizes,
        tiles: if scale_factors.is_empty() {
            Vec::new()
        } else {
            vec![TileInfo {
                width: tile_size,
                scale_factors,
            }]
        },
    }
}

// ============================================================================
// Presentation API: manifest.json
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub profile: String,
}

impl Service {
    fn level0(id: String) -> Self {
        Self {
            context: IMAGE_CONTEXT.to_string(),
            id,
            profile: LEVEL0_PROFILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub service: Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(rename = "@id")]
    pub id: String,
    pub service: Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub motivation: String,
    pub resource: ImageResource,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub images: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub canvases: Vec<Canvas>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub canvases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    pub sequences: Vec<Sequence>,
    pub structures: Vec<Range>,
}

/// One rendered page as the manifest sees it.
#[derive(Debug, Clone, Copy)]
pub struct CanvasSource<'a> {
    pub record: &'a PageRecord,
    pub width: u32,
    pub height: u32,
    pub variants: &'a [RenderedVariant],
    pub thumbnail: &'a RenderedThumbnail,
}

fn painting_annotation(urls: &UrlBuilder, page: &CanvasSource<'_>, canvas_id: &str) -> Vec<Annotation> {
    let record = page.record;
    let service_id = urls.image_service(&record.image_id());
    page.variants
        .iter()
        .max_by_key(|v| v.max_edge)
        .map(|largest| Annotation {
            id: urls.annotation(&record.id, &record.section),
            kind: "oa:Annotation".to_string(),
            motivation: "sc:painting".to_string(),
            resource: ImageResource {
                id: format!("{}/{}", service_id, largest.full_path),
                kind: "dctypes:Image".to_string(),
                format: "image/jpeg".to_string(),
                width: largest.width,
                height: largest.height,
                service: Service::level0(service_id.clone()),
            },
            on: canvas_id.to_string(),
        })
        .into_iter()
        .collect()
}

/// Build the manifest for one object from its rendered pages.
///
/// `pages` must be in page order. The first page carries the object's label,
/// description and thumbnail; the label falls back to `object_id`.
pub fn build_manifest(object_id: &str, pages: &[CanvasSource<'_>], urls: &UrlBuilder) -> Manifest {
    let master = pages
        .iter()
        .find(|p| p.record.is_master)
        .or_else(|| pages.first());

    let label = master
        .and_then(|p| p.record.label.clone())
        .unwrap_or_else(|| object_id.to_string());
    let description = master.and_then(|p| p.record.description.clone());
    let thumbnail = master.map(|p| {
        let service_id = urls.image_service(&p.record.image_id());
        Thumbnail {
            id: format!("{}/{}", service_id, p.thumbnail.path),
            service: Service::level0(service_id),
        }
    });

    let canvases: Vec<Canvas> = pages
        .iter()
        .map(|page| {
            let canvas_id = urls.canvas(object_id, &page.record.section);
            Canvas {
                images: painting_annotation(urls, page, &canvas_id),
                id: canvas_id,
                kind: "sc:Canvas".to_string(),
                label: page.record.section_label.clone(),
                width: page.width,
                height: page.height,
            }
        })
        .collect();

    let structures = pages
        .iter()
        .zip(&canvases)
        .map(|(page, canvas)| Range {
            id: urls.range(object_id, &page.record.section),
            kind: "sc:Range".to_string(),
            label: page.record.section_label.clone(),
            canvases: vec![canvas.id.clone()],
        })
        .collect();

    Manifest {
        context: PRESENTATION_CONTEXT.to_string(),
        id: urls.manifest(object_id),
        kind: "sc:Manifest".to_string(),
        label,
        description,
        thumbnail,
        sequences: vec![Sequence {
            id: urls.sequence(object_id),
            kind: "sc:Sequence".to_string(),
            canvases,
        }],
        structures,
    }
}

/// Write any IIIF document as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)
}
