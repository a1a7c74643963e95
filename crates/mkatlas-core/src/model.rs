use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AtlasError;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
}

/// Rendered glyph bitmap and the metrics needed to lay it out.
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Unicode code point.
    pub code: u32,
    pub advance_x: f32,
    pub advance_y: f32,
    /// Offset from the pen position to the bitmap's left edge.
    pub trans_x: i32,
    /// Offset from the line top to the bitmap's top edge.
    pub trans_y: i32,
    pub image: RgbaImage,
}

/// Inclusive range of Unicode code points, e.g. `32-126`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeRange {
    pub start: u32,
    pub end: u32,
}

impl CodeRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
    pub fn single(code: u32) -> Self {
        Self { start: code, end: code }
    }
    pub fn contains(&self, code: u32) -> bool {
        code >= self.start && code <= self.end
    }
    pub fn intersects(&self, other: &CodeRange) -> bool {
        self.contains(other.start)
            || self.contains(other.end)
            || other.contains(self.start)
            || other.contains(self.end)
    }
    /// Smallest range covering both. Only meaningful for intersecting ranges.
    pub fn join(&self, other: &CodeRange) -> CodeRange {
        debug_assert!(self.intersects(other), "can't join disjoint ranges");
        CodeRange::new(self.start.min(other.start), self.end.max(other.end))
    }
    /// Number of code points covered.
    pub fn count(&self) -> usize {
        (self.end - self.start) as usize + 1
    }
    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Where a fragment's content ended up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frame {
    /// Texture index.
    pub texture: usize,
    /// Top-left of the reserved slot; with expanded borders the content
    /// starts `padding >> 1` pixels further in (see [`Frame::content_origin`]).
    pub x: u32,
    pub y: u32,
    /// Unrotated content size.
    pub width: u32,
    pub height: u32,
    /// Content is stored rotated by 90°.
    pub flipped: bool,
}

impl Frame {
    /// Top-left of the content when borders were expanded by `expand` pixels.
    pub fn content_origin(&self, expand: u32) -> (u32, u32) {
        let lo = expand >> 1;
        (self.x + lo, self.y + lo)
    }
}

/// One output texture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

/// Packed image; `frame` is `None` when the image has no visible content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub name: String,
    pub real_width: u32,
    pub real_height: u32,
    /// Packed part of the original image.
    pub source: Rect,
    pub frame: Option<Frame>,
}

impl ImageRecord {
    /// True if trimming cut something off the original image.
    pub fn is_trimmed(&self) -> bool {
        self.source != Rect::new(0, 0, self.real_width, self.real_height)
    }
}

/// Packed glyph with its layout metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlyphRecord {
    pub code: u32,
    pub advance_x: f32,
    pub advance_y: f32,
    pub trans_x: i32,
    pub trans_y: i32,
    pub frame: Option<Frame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontRecord {
    pub name: String,
    pub size: u32,
    pub glyphs: Vec<GlyphRecord>,
}

/// Layout of a whole atlas (no pixels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atlas {
    pub textures: Vec<TextureInfo>,
    pub images: Vec<ImageRecord>,
    pub fonts: Vec<FontRecord>,
    /// Rotation was allowed; exporters only mention `flipped` when it was.
    pub allow_rotation: bool,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtlasStats {
    pub num_textures: usize,
    /// Fragments with visible content (images and glyphs).
    pub num_frames: usize,
    pub num_flipped: usize,
    pub total_texture_area: u64,
    pub used_frame_area: u64,
    /// used_frame_area / total_texture_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl Atlas {
    fn frames(&self) -> impl Iterator<Item = &Frame> {
        let images = self.images.iter().filter_map(|i| i.frame.as_ref());
        let glyphs = self
            .fonts
            .iter()
            .flat_map(|f| f.glyphs.iter().filter_map(|g| g.frame.as_ref()));
        images.chain(glyphs)
    }

    /// Computes packing statistics for this atlas.
    pub fn stats(&self) -> AtlasStats {
        let total_texture_area: u64 = self
            .textures
            .iter()
            .map(|t| t.width as u64 * t.height as u64)
            .sum();
        let mut num_frames = 0;
        let mut num_flipped = 0;
        let mut used_frame_area = 0u64;
        for frame in self.frames() {
            num_frames += 1;
            used_frame_area += frame.width as u64 * frame.height as u64;
            if frame.flipped {
                num_flipped += 1;
            }
        }
        let occupancy = if total_texture_area > 0 {
            used_frame_area as f64 / total_texture_area as f64
        } else {
            0.0
        };
        AtlasStats {
            num_textures: self.textures.len(),
            num_frames,
            num_flipped,
            total_texture_area,
            used_frame_area,
            occupancy,
        }
    }
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Textures: {}, Frames: {}, Occupancy: {:.2}%, Used Area: {} px², Flipped: {}",
            self.num_textures,
            self.num_frames,
            self.occupancy * 100.0,
            self.used_frame_area,
            self.num_flipped,
        )
    }
}

fn parse_code(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

impl FromStr for CodeRange {
    type Err = AtlasError;
    /// Accepts `N` or `A-B`; either side may be `0x`-prefixed hex.
    /// Code points past `U+10FFFF` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AtlasError::InvalidRange(s.to_string());
        let code = |part: &str| parse_code(part).filter(|&c| c <= char::MAX as u32);
        match s.split_once('-') {
            Some((a, b)) => {
                let start = code(a).ok_or_else(bad)?;
                let end = code(b).ok_or_else(bad)?;
                if end < start {
                    return Err(bad());
                }
                Ok(CodeRange::new(start, end))
            }
            None => code(s).map(CodeRange::single).ok_or_else(bad),
        }
    }
}

/// Sorts ranges by start and merges the ones that intersect.
pub fn coalesce_ranges(mut ranges: Vec<CodeRange>) -> Vec<CodeRange> {
    ranges.sort_by_key(|r| (r.start, r.end));
    let mut out: Vec<CodeRange> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match out.last_mut() {
            Some(last) if last.intersects(&r) => *last = last.join(&r),
            _ => out.push(r),
        }
    }
    out
}
