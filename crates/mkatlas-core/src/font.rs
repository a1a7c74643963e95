//! Glyph rasterization with `fontdue`.

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};
use tracing::{debug, instrument};

use crate::error::{AtlasError, Result};
use crate::model::{CodeRange, Glyph};

/// Parsed font ready for rasterization.
pub struct FontFace {
    font: Font,
}

impl FontFace {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| AtlasError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    /// Renders one code point at `size` pixels, filled with `color`.
    pub fn glyph(&self, code: u32, size: u32, color: [u8; 3]) -> Result<Glyph> {
        let ch = char::from_u32(code)
            .ok_or_else(|| AtlasError::Font(format!("U+{code:04X} is not a character")))?;
        let (metrics, coverage) = self.font.rasterize(ch, size as f32);
        let image = if metrics.width == 0 || metrics.height == 0 {
            RgbaImage::new(0, 0)
        } else {
            let [r, g, b] = color;
            let w = metrics.width as u32;
            RgbaImage::from_fn(w, metrics.height as u32, |x, y| {
                Rgba([r, g, b, coverage[(y * w + x) as usize]])
            })
        };
        let top = metrics.ymin + metrics.height as i32;
        Ok(Glyph {
            code,
            advance_x: metrics.advance_width,
            advance_y: metrics.advance_height,
            trans_x: metrics.xmin,
            trans_y: size as i32 - top,
            image,
        })
    }

    /// Renders every code point of `ranges`, in order.
    #[instrument(skip_all, fields(size = size, ranges = ranges.len()))]
    pub fn rasterize(&self, size: u32, color: [u8; 3], ranges: &[CodeRange]) -> Result<Vec<Glyph>> {
        let mut glyphs = Vec::new();
        for range in ranges {
            for code in range.iter() {
                glyphs.push(self.glyph(code, size, color)?);
            }
        }
        debug!(glyphs = glyphs.len(), "rasterized font");
        Ok(glyphs)
    }
}

/// Parses `bytes` and renders the code points of `ranges` at `size` pixels.
pub fn rasterize_font(
    bytes: &[u8],
    size: u32,
    color: [u8; 3],
    ranges: &[CodeRange],
) -> Result<Vec<Glyph>> {
    FontFace::from_bytes(bytes)?.rasterize(size, color, ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_font_error() {
        let err = FontFace::from_bytes(b"definitely not a font").err();
        assert!(matches!(err, Some(AtlasError::Font(_))));
    }
}
