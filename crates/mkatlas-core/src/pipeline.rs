use image::{DynamicImage, RgbaImage};
use tracing::{debug, error, info, instrument};

use crate::compositing::Canvas;
use crate::config::{AtlasConfig, FontSpec};
use crate::error::{AtlasError, Result};
use crate::model::{
    Atlas, FontRecord, Frame, Glyph, GlyphRecord, ImageRecord, Rect, TextureInfo,
};
use crate::packer::maxrects::MaxRectsPacker;
use crate::packer::{Placement, RequestId};
use crate::sdf;
use crate::trim::trim_bounds;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// In-memory image to pack (name + decoded image).
pub struct InputImage {
    pub key: String,
    pub image: DynamicImage,
}

/// Rasterized font to pack.
pub struct InputFont {
    pub spec: FontSpec,
    pub glyphs: Vec<Glyph>,
}

impl InputFont {
    /// Reads `spec.file` and rasterizes its ranges at `spec.raster_size()`.
    #[cfg(feature = "font")]
    pub fn load(spec: FontSpec) -> Result<Self> {
        spec.validate()?;
        let bytes = std::fs::read(&spec.file)?;
        let glyphs = crate::font::rasterize_font(
            &bytes,
            spec.raster_size(),
            spec.color,
            &spec.coalesced_ranges(),
        )?;
        Ok(Self { spec, glyphs })
    }
}

/// Output of an atlas build: layout plus one RGBA image per texture.
pub struct AtlasOutput {
    pub atlas: Atlas,
    pub textures: Vec<RgbaImage>,
}

impl AtlasOutput {
    /// Computes packing statistics for this output.
    pub fn stats(&self) -> crate::model::AtlasStats {
        self.atlas.stats()
    }
}

struct PreparedImage {
    key: String,
    rgba: RgbaImage,
    source: Rect,
}

fn prepare_image(input: InputImage, trim: bool) -> PreparedImage {
    let rgba = input.image.into_rgba8();
    let source = if trim {
        trim_bounds(&rgba)
    } else {
        Rect::new(0, 0, rgba.width(), rgba.height())
    };
    PreparedImage {
        key: input.key,
        rgba,
        source,
    }
}

fn prepare_images(inputs: Vec<InputImage>, trim: bool) -> Vec<PreparedImage> {
    #[cfg(feature = "parallel")]
    let iter = inputs.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = inputs.into_iter();
    iter.map(|input| prepare_image(input, trim)).collect()
}

/// Replaces the glyph bitmap by its distance field and rescales the metrics
/// to the field's resolution.
fn distance_field_glyph(glyph: Glyph, spread: u32, downscale: u32) -> Result<Glyph> {
    if glyph.image.width() == 0 || glyph.image.height() == 0 {
        return Ok(Glyph {
            advance_x: glyph.advance_x / downscale as f32,
            advance_y: glyph.advance_y / downscale as f32,
            ..glyph
        });
    }
    let image = sdf::generate(&glyph.image, spread, downscale)?;
    let pad = (spread / downscale) as i32;
    let scale = downscale as i32;
    Ok(Glyph {
        code: glyph.code,
        advance_x: glyph.advance_x / downscale as f32,
        advance_y: glyph.advance_y / downscale as f32,
        trans_x: glyph.trans_x.div_euclid(scale) - pad,
        trans_y: glyph.trans_y.div_euclid(scale) - pad,
        image,
    })
}

fn prepare_font(font: InputFont) -> Result<InputFont> {
    let InputFont { spec, glyphs } = font;
    if spec.sdf_spread == 0 {
        return Ok(InputFont { spec, glyphs });
    }
    spec.validate()?;
    let (spread, downscale) = (spec.sdf_spread, spec.sdf_downscale);
    #[cfg(feature = "parallel")]
    let iter = glyphs.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = glyphs.into_iter();
    let glyphs = iter
        .map(|g| distance_field_glyph(g, spread, downscale))
        .collect::<Result<Vec<_>>>()?;
    debug!(font = %spec.display_name(), glyphs = glyphs.len(), "generated distance fields");
    Ok(InputFont { spec, glyphs })
}

fn request(packer: &mut MaxRectsPacker, name: &str, w: u32, h: u32, padding: u32) -> Result<RequestId> {
    // Fragments without content never take up space.
    let (w, h) = if w == 0 || h == 0 {
        (0, 0)
    } else {
        (w + padding, h + padding)
    };
    packer.add(w, h).inspect_err(|e| error!(name, error = %e, "cannot pack"))
}

fn frame_of(p: &Placement, width: u32, height: u32) -> Option<Frame> {
    let texture = p.bin?;
    Some(Frame {
        texture,
        x: p.x,
        y: p.y,
        width,
        height,
        flipped: p.flipped,
    })
}

/// Packs `images` and the glyphs of `fonts` into textures and composites them.
///
/// Notes:
/// - Images are trimmed first when `cfg.trim` is set.
/// - Fonts with a non-zero `sdf_spread` have their glyphs replaced by distance fields.
/// - Every fragment reserves `cfg.padding` extra pixels; with `cfg.expand` the
///   padding is filled by replicating the fragment's border.
#[instrument(skip_all)]
pub fn build_atlas(
    images: Vec<InputImage>,
    fonts: Vec<InputFont>,
    cfg: &AtlasConfig,
) -> Result<AtlasOutput> {
    cfg.validate()?;
    if images.is_empty() && fonts.is_empty() {
        return Err(AtlasError::Empty);
    }

    let images = prepare_images(images, cfg.trim);
    let fonts = fonts
        .into_iter()
        .map(prepare_font)
        .collect::<Result<Vec<_>>>()?;

    let mut packer = MaxRectsPacker::new(cfg.packer_config());
    let image_ids = images
        .iter()
        .map(|img| request(&mut packer, &img.key, img.source.w, img.source.h, cfg.padding))
        .collect::<Result<Vec<_>>>()?;
    let mut glyph_ids: Vec<Vec<RequestId>> = Vec::with_capacity(fonts.len());
    for font in &fonts {
        let name = font.spec.display_name();
        let ids = font
            .glyphs
            .iter()
            .map(|g| request(&mut packer, &name, g.image.width(), g.image.height(), cfg.padding))
            .collect::<Result<Vec<_>>>()?;
        glyph_ids.push(ids);
    }

    packer.pack()?;

    let expand = cfg.draw_expand();
    let mut canvases = vec![Canvas::new(cfg.width, cfg.height); packer.bin_count()];

    let mut image_records = Vec::with_capacity(images.len());
    for (img, id) in images.iter().zip(&image_ids) {
        let p = packer.placement(*id);
        let frame = frame_of(p, img.source.w, img.source.h);
        if let Some(f) = &frame {
            canvases[f.texture].draw_rect(&img.rgba, img.source, p.x, p.y, p.flipped, expand);
        }
        image_records.push(ImageRecord {
            name: img.key.clone(),
            real_width: img.rgba.width(),
            real_height: img.rgba.height(),
            source: img.source,
            frame,
        });
    }

    let mut font_records = Vec::with_capacity(fonts.len());
    for (font, ids) in fonts.iter().zip(&glyph_ids) {
        let mut glyphs = Vec::with_capacity(font.glyphs.len());
        for (glyph, id) in font.glyphs.iter().zip(ids) {
            let p = packer.placement(*id);
            let frame = frame_of(p, glyph.image.width(), glyph.image.height());
            if let Some(f) = &frame {
                canvases[f.texture].draw(&glyph.image, p.x, p.y, p.flipped, expand);
            }
            glyphs.push(GlyphRecord {
                code: glyph.code,
                advance_x: glyph.advance_x,
                advance_y: glyph.advance_y,
                trans_x: glyph.trans_x,
                trans_y: glyph.trans_y,
                frame,
            });
        }
        font_records.push(FontRecord {
            name: font.spec.display_name(),
            size: font.spec.size,
            glyphs,
        });
    }

    let textures: Vec<RgbaImage> = canvases.into_iter().map(Canvas::into_image).collect();
    let atlas = Atlas {
        textures: textures
            .iter()
            .map(|t| TextureInfo {
                width: t.width(),
                height: t.height(),
            })
            .collect(),
        images: image_records,
        fonts: font_records,
        allow_rotation: cfg.allow_rotation,
    };
    info!(textures = textures.len(), "atlas built");
    Ok(AtlasOutput { atlas, textures })
}
