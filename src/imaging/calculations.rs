//! Pure calculation functions for tile geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Two coordinate spaces
//!
//! A variant is the source image scaled so that its longer edge equals the
//! variant's maximum edge. The tile grid is laid out in that *scaled* space
//! (`tile_edge` × `tile_edge` cells, smaller at the right and bottom), and
//! every grid line is mapped back into *source* space to get the crop
//! rectangle. Rendering crops the original at full resolution and only then
//! resizes the crop to the cell size.
//!
//! When downscaling, grid lines are mapped once and shared by the two cells on
//! either side, so crops meet exactly in source space and cells meet exactly
//! in scaled space. When upscaling, a cell can be narrower than one source
//! pixel, so each crop is widened outward (floor of the start, ceil of the
//! end) and neighbouring crops may share a source pixel. Scaled space is
//! still covered exactly.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Invalid source dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Variant edge must be non-zero")]
    InvalidVariantEdge,
    #[error("Tile edge must be non-zero")]
    InvalidTileEdge,
}

/// One cropped-and-resized piece of an (image, variant) pair.
///
/// `x`, `y`, `width`, `height` are the crop rectangle in source pixels;
/// `x_size`, `y_size` are the output dimensions after resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub x_size: u32,
    pub y_size: u32,
}

/// Scale factor mapping the longer source edge to `max_edge`.
pub fn scale_factor(source: (u32, u32), max_edge: u32) -> f64 {
    let longer = source.0.max(source.1);
    max_edge as f64 / longer as f64
}

/// Calculate the full image size at a variant.
///
/// The longer edge is exactly `max_edge`; the shorter edge is rounded to the
/// nearest pixel and never drops below 1.
///
/// ```
/// # use iiif_pyramid::imaging::scaled_dimensions;
/// assert_eq!(scaled_dimensions((4000, 3000), 1200), (1200, 900));
/// assert_eq!(scaled_dimensions((3000, 4000), 600), (450, 600));
/// ```
pub fn scaled_dimensions(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (src_w, src_h) = source;

    if src_w >= src_h {
        let h = (src_h as f64 * max_edge as f64 / src_w as f64).round() as u32;
        (max_edge, h.max(1))
    } else {
        let w = (src_w as f64 * max_edge as f64 / src_h as f64).round() as u32;
        (w.max(1), max_edge)
    }
}

/// Map a scaled-space coordinate back to source space.
///
/// `scaled_pos * longer / max_edge`, rounded half up, in integer arithmetic
/// so that every caller gets the same answer for the same grid line.
fn to_source(scaled_pos: u32, longer: u32, max_edge: u32) -> u32 {
    let num = 2 * scaled_pos as u64 * longer as u64 + max_edge as u64;
    (num / (2 * max_edge as u64)) as u32
}

/// One grid cell along one axis: scaled-space span and source-space crop.
#[derive(Debug, Clone, Copy)]
struct Span {
    scaled_start: u32,
    scaled_len: u32,
    source_start: u32,
    source_len: u32,
}

/// Cells along one axis, in order.
///
/// Downscaling shares rounded grid lines between neighbours. Upscaling widens
/// each crop to whole source pixels: `floor(start)..ceil(end)`, clamped to
/// the source, which always leaves at least one pixel.
fn axis_spans(
    source_len: u32,
    scaled_len: u32,
    tile_edge: u32,
    longer: u32,
    max_edge: u32,
) -> Vec<Span> {
    let starts: Vec<u32> = (0..scaled_len).step_by(tile_edge as usize).collect();
    let ends = starts.iter().skip(1).copied().chain([scaled_len]);

    starts
        .iter()
        .zip(ends)
        .map(|(&start, end)| {
            let (source_start, source_end) = if max_edge <= longer {
                let to = |pos: u32| {
                    if pos == scaled_len {
                        source_len
                    } else {
                        to_source(pos, longer, max_edge).min(source_len)
                    }
                };
                (to(start), to(end))
            } else {
                let floor = (start as u64 * longer as u64 / max_edge as u64) as u32;
                let ceil = (end as u64 * longer as u64).div_ceil(max_edge as u64) as u32;
                let source_start = floor.min(source_len - 1);
                (source_start, ceil.clamp(source_start + 1, source_len))
            };
            Span {
                scaled_start: start,
                scaled_len: end - start,
                source_start,
                source_len: source_end - source_start,
            }
        })
        .collect()
}

/// Compute the tiles needed to cover a source image at one variant.
///
/// Tiles are returned row-major (top row first, left to right).
///
/// # Arguments
/// * `source_width`, `source_height` - Original image dimensions
/// * `variant_max_edge` - Longer edge of the full image at this variant
/// * `tile_edge` - Edge length of a grid cell in scaled space
///
/// # Errors
/// Returns [`GeometryError`] for zero-sized inputs only. Any positive source
/// size yields tiles, however far the variant upscales it.
pub fn tiles_for(
    source_width: u32,
    source_height: u32,
    variant_max_edge: u32,
    tile_edge: u32,
) -> Result<Vec<Tile>, GeometryError> {
    if source_width == 0 || source_height == 0 {
        return Err(GeometryError::InvalidDimensions {
            width: source_width,
            height: source_height,
        });
    }
    if variant_max_edge == 0 {
        return Err(GeometryError::InvalidVariantEdge);
    }
    if tile_edge == 0 {
        return Err(GeometryError::InvalidTileEdge);
    }

    let longer = source_width.max(source_height);
    let (scaled_w, scaled_h) =
        scaled_dimensions((source_width, source_height), variant_max_edge);

    let columns = axis_spans(source_width, scaled_w, tile_edge, longer, variant_max_edge);
    let rows = axis_spans(source_height, scaled_h, tile_edge, longer, variant_max_edge);

    let mut tiles = Vec::with_capacity(columns.len() * rows.len());
    for row in &rows {
        for col in &columns {
            tiles.push(Tile {
                x: col.source_start,
                y: row.source_start,
                width: col.source_len,
                height: row.source_len,
                x_size: col.scaled_len,
                y_size: row.scaled_len,
            });
        }
    }

    Ok(tiles)
}

/// Scale factors a level 0 client can request from the tiles on disk.
///
/// A client asks for region `tile * sf` source pixels at output width
/// `ceil(region / sf)`. That only lands on a written tile when the variant is
/// an exact integer reduction of the source (`longer == edge * sf`) and the
/// variant's rounded short edge equals `ceil(short / sf)`. Variants that fail
/// either test are still rendered and listed under `sizes`, but advertising
/// them as tiles would point clients at files that do not exist.
///
/// Returns a sorted, deduplicated list, possibly empty.
pub fn level0_scale_factors(source: (u32, u32), variant_edges: &[u32]) -> Vec<u32> {
    let longer = source.0.max(source.1);
    let shorter = source.0.min(source.1);
    if longer == 0 {
        return Vec::new();
    }

    let mut factors: Vec<u32> = variant_edges
        .iter()
        .filter(|&&edge| edge > 0 && edge <= longer && longer % edge == 0)
        .map(|&edge| longer / edge)
        .filter(|&sf| {
            let (w, h) = scaled_dimensions(source, longer / sf);
            w.min(h) == shorter.div_ceil(sf)
        })
        .collect();
    factors.sort_unstable();
    factors.dedup();
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check that tiles exactly partition both the scaled and source images.
    fn assert_exact_cover(w: u32, h: u32, v: u32, t: u32) {
        let tiles = tiles_for(w, h, v, t).unwrap();
        let (sw, sh) = scaled_dimensions((w, h), v);

        let out_area: u64 = tiles.iter().map(|t| t.x_size as u64 * t.y_size as u64).sum();
        assert_eq!(out_area, sw as u64 * sh as u64, "scaled area for {w}x{h}@{v}/{t}");

        let src_area: u64 = tiles.iter().map(|t| t.width as u64 * t.height as u64).sum();
        assert_eq!(src_area, w as u64 * h as u64, "source area for {w}x{h}@{v}/{t}");

        for tile in &tiles {
            assert!(tile.x + tile.width <= w, "crop exceeds width: {tile:?}");
            assert!(tile.y + tile.height <= h, "crop exceeds height: {tile:?}");
            assert!(tile.x_size <= t && tile.y_size <= t, "cell larger than tile: {tile:?}");
        }
    }

    /// Paint every scaled-space cell onto a pixel grid and require each pixel once.
    fn assert_each_scaled_pixel_once(w: u32, h: u32, v: u32, t: u32) {
        let tiles = tiles_for(w, h, v, t).unwrap();
        let (sw, sh) = scaled_dimensions((w, h), v);
        let columns: Vec<u32> = tiles.iter().filter(|t| t.y == 0).map(|t| t.x_size).collect();
        let mut hits = vec![0u8; (sw * sh) as usize];

        let mut oy = 0;
        for row in tiles.chunks(columns.len()) {
            let mut ox = 0;
            for tile in row {
                for y in oy..oy + tile.y_size {
                    for x in ox..ox + tile.x_size {
                        hits[(y * sw + x) as usize] += 1;
                    }
                }
                ox += tile.x_size;
            }
            assert_eq!(ox, sw);
            oy += row[0].y_size;
        }
        assert_eq!(oy, sh);
        assert!(hits.iter().all(|&n| n == 1));
    }

    // =========================================================================
    // scaled_dimensions tests
    // =========================================================================

    #[test]
    fn scaled_landscape() {
        assert_eq!(scaled_dimensions((4000, 3000), 1200), (1200, 900));
    }

    #[test]
    fn scaled_portrait() {
        assert_eq!(scaled_dimensions((3000, 4000), 600), (450, 600));
    }

    #[test]
    fn scaled_rounds_to_nearest() {
        // 1000 * 600 / 2999 = 200.07 → 200
        assert_eq!(scaled_dimensions((2999, 1000), 600), (600, 200));
        // 1001 * 600 / 1200 = 500.5 → 501
        assert_eq!(scaled_dimensions((1200, 1001), 600), (600, 501));
    }

    #[test]
    fn scaled_short_edge_never_zero() {
        assert_eq!(scaled_dimensions((10000, 1), 600), (600, 1));
    }

    #[test]
    fn scale_factor_uses_longer_edge() {
        assert_eq!(scale_factor((2400, 1200), 1200), 0.5);
        assert_eq!(scale_factor((1200, 2400), 1200), 0.5);
    }

    // =========================================================================
    // tiles_for tests
    // =========================================================================

    #[test]
    fn single_tile_when_variant_fits() {
        let tiles = tiles_for(3000, 2000, 300, 512).unwrap();
        assert_eq!(
            tiles,
            vec![Tile {
                x: 0,
                y: 0,
                width: 3000,
                height: 2000,
                x_size: 300,
                y_size: 200,
            }]
        );
    }

    #[test]
    fn unit_scale_returns_identity_crops() {
        let tiles = tiles_for(1200, 900, 1200, 512).unwrap();
        assert_eq!(tiles.len(), 3 * 2);
        for tile in &tiles {
            assert_eq!((tile.width, tile.height), (tile.x_size, tile.y_size));
        }
        assert_eq!(tiles.last().unwrap().x, 1024);
        assert_eq!(tiles.last().unwrap().x_size, 176);
        assert_eq!(tiles.last().unwrap().y_size, 388);
    }

    #[test]
    fn unit_scale_whole_image_single_tile() {
        let tiles = tiles_for(400, 300, 400, 512).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].width, 400);
        assert_eq!(tiles[0].x_size, 400);
    }

    #[test]
    fn grid_is_row_major() {
        let tiles = tiles_for(4000, 3000, 1200, 512).unwrap();
        // 1200x900 → 3 columns × 2 rows
        assert_eq!(tiles.len(), 6);
        let origins: Vec<(u32, u32)> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(origins[0], (0, 0));
        assert_eq!(origins[1].1, 0);
        assert_eq!(origins[2].1, 0);
        assert!(origins[3].1 > 0);
        assert_eq!(origins[3].0, 0);
    }

    #[test]
    fn edge_tiles_reach_exactly_the_border() {
        let tiles = tiles_for(4000, 3000, 1200, 512).unwrap();
        let last = tiles.last().unwrap();
        assert_eq!(last.x + last.width, 4000);
        assert_eq!(last.y + last.height, 3000);
        assert_eq!(last.x_size, 1200 - 1024);
        assert_eq!(last.y_size, 900 - 512);
    }

    #[test]
    fn crop_maps_back_through_scale() {
        // scale = 1200 / 4000 = 0.3; tile 512 → 1706.67 source px
        let tiles = tiles_for(4000, 3000, 1200, 512).unwrap();
        assert_eq!(tiles[0].width, 1707);
        assert_eq!(tiles[1].x, 1707);
        assert_eq!(tiles[1].width, 3413 - 1707);
    }

    #[test]
    fn crop_before_resize_within_one_pixel() {
        for &(w, h) in &[(4000, 3000), (2999, 1000), (6123, 4087), (1201, 1199), (777, 5001)] {
            for &v in &[600, 1200, 2048] {
                if v > w.max(h) {
                    continue;
                }
                let scale = scale_factor((w, h), v);
                for tile in tiles_for(w, h, v, 512).unwrap() {
                    let dx = (tile.width as f64 * scale - tile.x_size as f64).abs();
                    let dy = (tile.height as f64 * scale - tile.y_size as f64).abs();
                    assert!(dx <= 1.0, "{w}x{h}@{v}: {tile:?} dx={dx}");
                    assert!(dy <= 1.0, "{w}x{h}@{v}: {tile:?} dy={dy}");
                }
            }
        }
    }

    #[test]
    fn exact_cover_across_shapes() {
        let shapes = [
            (4000, 3000),
            (3000, 4000),
            (2999, 1000),
            (6123, 4087),
            (1201, 1199),
            (777, 5001),
            (600, 600),
            (513, 1),
            (1, 513),
        ];
        for &(w, h) in &shapes {
            for &v in &[100, 600, 1200] {
                for &t in &[64, 256, 512] {
                    if v > w.max(h) {
                        assert_upscaled_cover(w, h, v, t);
                    } else {
                        assert_exact_cover(w, h, v, t);
                    }
                }
            }
        }
    }

    #[test]
    fn exact_cover_when_upscaling() {
        assert_exact_cover(300, 200, 600, 512);
        assert_exact_cover(300, 200, 1200, 256);
    }

    #[test]
    fn every_scaled_pixel_covered_once() {
        assert_each_scaled_pixel_once(4000, 3000, 600, 128);
        assert_each_scaled_pixel_once(1001, 2999, 300, 64);
        assert_each_scaled_pixel_once(700, 700, 700, 256);
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            tiles_for(0, 100, 600, 512),
            Err(GeometryError::InvalidDimensions {
                width: 0,
                height: 100
            })
        );
        assert!(matches!(
            tiles_for(100, 0, 600, 512),
            Err(GeometryError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn rejects_zero_variant_and_tile_edges() {
        assert_eq!(tiles_for(100, 100, 0, 512), Err(GeometryError::InvalidVariantEdge));
        assert_eq!(tiles_for(100, 100, 600, 0), Err(GeometryError::InvalidTileEdge));
    }

    /// Tiny sources blown up far past their size: every crop is at least one
    /// source pixel, stays in bounds, and scaled space is still covered once.
    fn assert_upscaled_cover(w: u32, h: u32, v: u32, t: u32) {
        let tiles = tiles_for(w, h, v, t).unwrap();
        let (sw, sh) = scaled_dimensions((w, h), v);
        let columns = sw.div_ceil(t) as usize;
        assert_eq!(tiles.len(), columns * sh.div_ceil(t) as usize);

        for tile in &tiles {
            assert!(tile.width >= 1 && tile.height >= 1, "empty crop: {tile:?}");
            assert!(tile.x + tile.width <= w, "crop exceeds width: {tile:?}");
            assert!(tile.y + tile.height <= h, "crop exceeds height: {tile:?}");
        }

        let out_area: u64 = tiles.iter().map(|t| t.x_size as u64 * t.y_size as u64).sum();
        assert_eq!(out_area, sw as u64 * sh as u64, "scaled area for {w}x{h}@{v}/{t}");

        let first = tiles[0];
        let last = tiles[tiles.len() - 1];
        assert_eq!((first.x, first.y), (0, 0));
        assert_eq!((last.x + last.width, last.y + last.height), (w, h));
        let row_width: u32 = tiles[..columns].iter().map(|t| t.x_size).sum();
        assert_eq!(row_width, sw);
    }

    #[test]
    fn tiny_sources_upscale_without_error() {
        assert_upscaled_cover(3, 2, 600, 512);
        assert_upscaled_cover(2, 2, 1200, 512);
        assert_upscaled_cover(1, 1, 1200, 256);
        assert_upscaled_cover(2, 2, 600, 1);
        assert_upscaled_cover(7, 3, 1200, 100);
    }

    #[test]
    fn upscaled_crops_share_edge_pixels() {
        // 3x2 → 600x400, one column boundary at scaled 512 = source 2.56
        assert_eq!(
            tiles_for(3, 2, 600, 512).unwrap(),
            vec![
                Tile { x: 0, y: 0, width: 3, height: 2, x_size: 512, y_size: 400 },
                Tile { x: 2, y: 0, width: 1, height: 2, x_size: 88, y_size: 400 },
            ]
        );
    }

    // =========================================================================
    // level0_scale_factors tests
    // =========================================================================

    #[test]
    fn scale_factors_only_for_exact_reductions() {
        // 4000/600 and 4000/1200 are not integers
        assert!(level0_scale_factors((4000, 3000), &[600, 1200]).is_empty());
        assert_eq!(level0_scale_factors((4000, 3000), &[1000, 2000, 4000]), vec![1, 2, 4]);
    }

    #[test]
    fn scale_factors_sorted_and_deduplicated() {
        assert_eq!(level0_scale_factors((4800, 3600), &[1200, 600, 1200]), vec![4, 8]);
    }

    #[test]
    fn scale_factors_skip_upscaled_variants() {
        assert!(level0_scale_factors((300, 200), &[600, 1200]).is_empty());
    }

    #[test]
    fn scale_factors_require_short_edge_to_match_ceil() {
        // 2998 / 3 = 999.33: rendered 999 rows, client expects 1000
        assert!(level0_scale_factors((3000, 2998), &[1000]).is_empty());
        // 3002 / 2 = 1501 exactly
        assert_eq!(level0_scale_factors((4000, 3002), &[2000]), vec![2]);
    }

    #[test]
    fn advertised_factors_land_on_rendered_tiles() {
        let (w, h, t) = (4096, 3000, 256);
        for sf in level0_scale_factors((w, h), &[4096, 2048, 1024, 1000]) {
            let tiles = tiles_for(w, h, w / sf, t).unwrap();
            let step = t * sf;
            let mut expected = Vec::new();
            for y in (0..h).step_by(step as usize) {
                for x in (0..w).step_by(step as usize) {
                    let rw = step.min(w - x);
                    let rh = step.min(h - y);
                    expected.push((x, y, rw, rh, rw.div_ceil(sf)));
                }
            }
            let actual: Vec<_> = tiles
                .iter()
                .map(|t| (t.x, t.y, t.width, t.height, t.x_size))
                .collect();
            assert_eq!(actual, expected, "scale factor {sf}");
        }
    }
}
