//! Brute-force signed distance fields for glyph bitmaps.
//!
//! Each output pixel stores the distance from its sample point to the nearest
//! pixel of opposite state, clamped to `spread` and mapped to `0..=255` with
//! 128 on the outline (brighter inside, darker outside).

use image::{Rgba, RgbaImage};

use crate::error::{AtlasError, Result};

/// A source pixel counts as inside when the high bit of its alpha is set.
fn is_inside(px: &Rgba<u8>) -> bool {
    px[3] & 0x80 != 0
}

struct InsideMap {
    width: i32,
    height: i32,
    bits: Vec<bool>,
}

impl InsideMap {
    fn new(img: &RgbaImage) -> Self {
        Self {
            width: img.width() as i32,
            height: img.height() as i32,
            bits: img.pixels().map(is_inside).collect(),
        }
    }

    fn at(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y * self.width + x) as usize]
    }

    /// Signed distance in `[-1, 1]` (units of `spread`) at source point (x, y).
    fn signed_distance(&self, x: i32, y: i32, spread: f32) -> f32 {
        let inside = self.at(x, y);
        let delta = spread.ceil() as i32;
        let (w, h) = (self.width, self.height);

        let mut min_dist = delta as i64 * delta as i64;
        let mut consider = |dx: i32, dy: i32| {
            let (dx, dy) = (dx as i64, dy as i64);
            min_dist = min_dist.min(dx * dx + dy * dy);
        };

        // Everything past the image edge is outside.
        if inside {
            consider(x + 1, 0);
            consider(w - x, 0);
            consider(y + 1, 0);
            consider(h - y, 0);
        }

        let (x0, x1) = ((x - delta).clamp(0, w - 1), (x + delta).clamp(0, w - 1));
        let (y0, y1) = ((y - delta).clamp(0, h - 1), (y + delta).clamp(0, h - 1));
        for j in y0..=y1 {
            for i in x0..=x1 {
                if self.bits[(j * w + i) as usize] != inside {
                    consider(x - i, y - j);
                }
            }
        }

        let dist = (min_dist as f64).sqrt().min(spread as f64) as f32 / spread;
        if inside { dist } else { -dist }
    }
}

fn encode(dist: f32) -> Rgba<u8> {
    let v = (0.5 + 0.5 * dist).clamp(0.0, 1.0);
    let c = (v * 255.0) as u8;
    Rgba([c, c, c, 0xFF])
}

/// Size of the field produced for a `w`x`h` source.
pub fn output_size(w: u32, h: u32, spread: u32, downscale: u32) -> (u32, u32) {
    let pad = spread / downscale;
    (w.div_ceil(downscale) + 2 * pad, h.div_ceil(downscale) + 2 * pad)
}

/// Builds a distance field from the alpha channel of `src`.
///
/// The output is downscaled by `downscale` and padded by `spread / downscale`
/// pixels on every side so the field can fade out around the shape. An empty
/// source is returned unchanged.
pub fn generate(src: &RgbaImage, spread: u32, downscale: u32) -> Result<RgbaImage> {
    if spread == 0 || downscale == 0 {
        return Err(AtlasError::InvalidInput(format!(
            "distance field needs non-zero spread and downscale (got {spread} and {downscale})"
        )));
    }
    if src.width() == 0 || src.height() == 0 {
        return Ok(src.clone());
    }

    let map = InsideMap::new(src);
    let pad = (spread / downscale) as i32;
    let scale = downscale as i32;
    let (w, h) = output_size(src.width(), src.height(), spread, downscale);

    Ok(RgbaImage::from_fn(w, h, |i, j| {
        let x = (i as i32 - pad) * scale + scale / 2;
        let y = (j as i32 - pad) * scale + scale / 2;
        encode(map.signed_distance(x, y, spread as f32))
    }))
}
