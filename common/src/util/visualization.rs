use crate::db::core::RPoint;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::Path;

const TILE_PX: u32 = 8;

/// Renders per-edge utilization (demand / capacity) as a heat map.
///
/// `vert_util` is indexed `x + y * w` over `w * (h - 1)` vertical
/// edges; `hori_util` is indexed `x * h + y` over `(w - 1) * h`
/// horizontal edges. Values at or above 1.0 are overflowed.
pub fn draw_congestion_map(
    filename: &str,
    w: usize,
    h: usize,
    vert_util: &[f32],
    hori_util: &[f32],
) {
    let (iw, ih) = (w as u32 * TILE_PX, h as u32 * TILE_PX);
    let mut img = RgbImage::from_pixel(iw, ih, Rgb([20, 20, 20]));

    for y in 0..h.saturating_sub(1) {
        for x in 0..w {
            let u = vert_util[x + y * w];
            let (x0, y0) = tile_center(x, y, h);
            let (x1, y1) = tile_center(x, y + 1, h);
            draw_line_segment_mut(&mut img, (x0, y0), (x1, y1), heat(u));
        }
    }
    for x in 0..w.saturating_sub(1) {
        for y in 0..h {
            let u = hori_util[x * h + y];
            let (x0, y0) = tile_center(x, y, h);
            let (x1, y1) = tile_center(x + 1, y, h);
            draw_line_segment_mut(&mut img, (x0, y0), (x1, y1), heat(u));
        }
    }

    if let Err(e) = img.save(Path::new(filename)) {
        log::error!("failed to write congestion map {}: {}", filename, e);
    }
}

/// Renders routed paths, one color per net, on a dark background.
pub fn draw_net_map(filename: &str, w: usize, h: usize, paths: &[&[RPoint]]) {
    let (iw, ih) = (w as u32 * TILE_PX, h as u32 * TILE_PX);
    let mut img = RgbImage::from_pixel(iw, ih, Rgb([0, 0, 0]));

    for (i, path) in paths.iter().enumerate() {
        let color = palette(i);
        for rp in path.iter() {
            let (x0, y0) = tile_center(rp.x as usize, rp.y as usize, h);
            let (x1, y1) = if rp.hori {
                tile_center(rp.x as usize + 1, rp.y as usize, h)
            } else {
                tile_center(rp.x as usize, rp.y as usize + 1, h)
            };
            draw_line_segment_mut(&mut img, (x0, y0), (x1, y1), color);
        }
    }

    if let Err(e) = img.save(Path::new(filename)) {
        log::error!("failed to write net map {}: {}", filename, e);
    }
}

fn tile_center(x: usize, y: usize, h: usize) -> (f32, f32) {
    // Image rows grow downward; tile rows grow upward.
    let px = x as f32 * TILE_PX as f32 + TILE_PX as f32 / 2.0;
    let py = (h - 1 - y) as f32 * TILE_PX as f32 + TILE_PX as f32 / 2.0;
    (px, py)
}

fn heat(u: f32) -> Rgb<u8> {
    let u = if u.is_finite() { u.clamp(0.0, 2.0) } else { 2.0 };
    if u < 1.0 {
        // green toward yellow as the edge fills up
        Rgb([(40.0 + 215.0 * u) as u8, (220.0 - 60.0 * u) as u8, 60])
    } else {
        // overflowed: yellow toward saturated red
        let t = u - 1.0;
        Rgb([255, (160.0 - 160.0 * t) as u8, 40])
    }
}

fn palette(i: usize) -> Rgb<u8> {
    const COLORS: [[u8; 3]; 8] = [
        [180, 60, 60],
        [60, 180, 60],
        [60, 60, 180],
        [180, 180, 60],
        [60, 180, 180],
        [180, 60, 180],
        [220, 120, 40],
        [120, 220, 120],
    ];
    Rgb(COLORS[i % COLORS.len()])
}
