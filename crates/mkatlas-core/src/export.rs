use serde_json::{Map, Value, json};

use crate::model::{Atlas, Frame, FontRecord, ImageRecord};

/// File name of texture `idx`: `prefix` followed by a two-digit index and `.png`.
pub fn texture_file_name(prefix: &str, idx: usize) -> String {
    format!("{prefix}{idx:02}.png")
}

fn put_frame(obj: &mut Map<String, Value>, fr: &Frame, allow_rotation: bool) {
    obj.insert("x".into(), json!(fr.x));
    obj.insert("y".into(), json!(fr.y));
    obj.insert("width".into(), json!(fr.width));
    obj.insert("height".into(), json!(fr.height));
    if allow_rotation {
        obj.insert("flipped".into(), json!(fr.flipped));
    }
}

fn image_json(img: &ImageRecord, allow_rotation: bool) -> Value {
    let mut obj = Map::new();
    match &img.frame {
        Some(fr) => {
            obj.insert("texture".into(), json!(fr.texture));
            obj.insert("name".into(), json!(img.name));
            if img.is_trimmed() {
                obj.insert("offsetX".into(), json!(img.source.x));
                obj.insert("offsetY".into(), json!(img.source.y));
                obj.insert("realWidth".into(), json!(img.real_width));
                obj.insert("realHeight".into(), json!(img.real_height));
            }
            put_frame(&mut obj, fr, allow_rotation);
        }
        // nothing visible was packed
        None => {
            obj.insert("name".into(), json!(img.name));
            obj.insert("realWidth".into(), json!(img.real_width));
            obj.insert("realHeight".into(), json!(img.real_height));
        }
    }
    Value::Object(obj)
}

fn font_json(font: &FontRecord, allow_rotation: bool) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(font.name));
    obj.insert("size".into(), json!(font.size));
    if font.glyphs.is_empty() {
        return Value::Object(obj);
    }
    let glyphs = font
        .glyphs
        .iter()
        .map(|g| {
            let mut gobj = Map::new();
            if let Some(fr) = &g.frame {
                gobj.insert("texture".into(), json!(fr.texture));
                gobj.insert("code".into(), json!(g.code));
                put_frame(&mut gobj, fr, allow_rotation);
                gobj.insert("advX".into(), json!(g.advance_x));
                gobj.insert("advY".into(), json!(g.advance_y));
                gobj.insert("transX".into(), json!(g.trans_x));
                gobj.insert("transY".into(), json!(g.trans_y));
            } else {
                gobj.insert("code".into(), json!(g.code));
                gobj.insert("advX".into(), json!(g.advance_x));
                gobj.insert("advY".into(), json!(g.advance_y));
            }
            Value::Object(gobj)
        })
        .collect::<Vec<_>>();
    obj.insert("glyphs".into(), Value::Array(glyphs));
    Value::Object(obj)
}

/// Metadata document for `atlas`.
///
/// Shape: `{ textures: [{file, width, height}], images?: [...], fonts?: [...] }`.
/// `texture_files` holds the file name of each texture, in texture order.
/// Empty `images`/`fonts` sections are left out, and `flipped` only appears
/// when rotation was allowed.
///
/// Fragment `x`/`y` are the top-left of the reserved slot. Glyphs of fonts
/// with a distance field carry metrics in field pixels: `advX`/`advY` are
/// divided by the font's `sdf_downscale`, and `transX`/`transY` are scaled the
/// same way and moved out by the field's padding, so they line up with the
/// smaller bitmap rather than with the raster-size glyph.
pub fn to_json(atlas: &Atlas, texture_files: &[String]) -> Value {
    let textures = atlas
        .textures
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let file = texture_files
                .get(i)
                .cloned()
                .unwrap_or_else(|| texture_file_name("texture", i));
            json!({"file": file, "width": t.width, "height": t.height})
        })
        .collect::<Vec<_>>();

    let mut root = Map::new();
    root.insert("textures".into(), Value::Array(textures));
    if !atlas.images.is_empty() {
        let images = atlas
            .images
            .iter()
            .map(|img| image_json(img, atlas.allow_rotation))
            .collect();
        root.insert("images".into(), Value::Array(images));
    }
    if !atlas.fonts.is_empty() {
        let fonts = atlas
            .fonts
            .iter()
            .map(|f| font_json(f, atlas.allow_rotation))
            .collect();
        root.insert("fonts".into(), Value::Array(fonts));
    }
    Value::Object(root)
}

/// Pretty-printed [`to_json`] followed by a newline.
pub fn to_json_string(atlas: &Atlas, texture_files: &[String]) -> serde_json::Result<String> {
    let mut s = serde_json::to_string_pretty(&to_json(atlas, texture_files))?;
    s.push('\n');
    Ok(s)
}
