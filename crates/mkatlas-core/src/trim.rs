use image::RgbaImage;

use crate::model::Rect;

fn row_has_content(rgba: &RgbaImage, y: u32, xs: std::ops::RangeInclusive<u32>) -> bool {
    xs.into_iter().any(|x| rgba.get_pixel(x, y)[3] != 0)
}

fn col_has_content(rgba: &RgbaImage, x: u32, ys: std::ops::RangeInclusive<u32>) -> bool {
    ys.into_iter().any(|y| rgba.get_pixel(x, y)[3] != 0)
}

/// Tight bounding box of the pixels with non-zero alpha.
///
/// Fully transparent (or empty) images yield a zero-sized rect at the origin.
pub fn trim_bounds(rgba: &RgbaImage) -> Rect {
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Rect::default();
    }
    // top
    let Some(y1) = (0..h).find(|&y| row_has_content(rgba, y, 0..=w - 1)) else {
        return Rect::default();
    };
    // bottom
    let y2 = (y1..h)
        .rev()
        .find(|&y| row_has_content(rgba, y, 0..=w - 1))
        .unwrap_or(y1);
    // left
    let x1 = (0..w)
        .find(|&x| col_has_content(rgba, x, y1..=y2))
        .unwrap_or(0);
    // right
    let x2 = (x1..w)
        .rev()
        .find(|&x| col_has_content(rgba, x, y1..=y2))
        .unwrap_or(x1);
    Rect::new(x1, y1, x2 - x1 + 1, y2 - y1 + 1)
}
