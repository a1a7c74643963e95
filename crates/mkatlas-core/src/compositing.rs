use image::{Rgba, RgbaImage};

use crate::model::Rect;

/// Size of a fragment once drawn: rotated content plus `expand` pixels of padding.
pub fn drawn_size(w: u32, h: u32, flip: bool, expand: u32) -> (u32, u32) {
    let (cw, ch) = if flip { (h, w) } else { (w, h) };
    (cw + expand, ch + expand)
}

/// Blit the sub-rectangle `source` of `src` into `canvas` with its padded
/// footprint starting at (dx, dy).
///
/// - flip: rotate 90° so that the right-most source column becomes the top row
/// - expand: padding width; `expand >> 1` pixels go on the top/left and the
///   rest on the bottom/right, filled by replicating the edge rows, columns and
///   corner pixels of the content
///
/// Panics if `source` lies outside `src` or the padded footprint outside
/// `canvas`; the packer is responsible for reserving enough room.
pub fn blit_rgba(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    source: Rect,
    flip: bool,
    expand: u32,
) {
    if source.is_empty() {
        return;
    }
    assert!(
        source.right() <= src.width() && source.bottom() <= src.height(),
        "source rect {source:?} outside {}x{} image",
        src.width(),
        src.height()
    );
    let (fw, fh) = drawn_size(source.w, source.h, flip, expand);
    assert!(
        dx as u64 + fw as u64 <= canvas.width() as u64
            && dy as u64 + fh as u64 <= canvas.height() as u64,
        "{fw}x{fh} fragment at ({dx}, {dy}) outside {}x{} canvas",
        canvas.width(),
        canvas.height()
    );

    // content size after rotation
    let (cw, ch) = (fw - expand, fh - expand);
    let lo = expand >> 1;
    let hi = expand - lo;

    // pixel (i, j) of the oriented content
    let fetch = |i: u32, j: u32| -> Rgba<u8> {
        if flip {
            *src.get_pixel(source.x + source.w - 1 - j, source.y + i)
        } else {
            *src.get_pixel(source.x + i, source.y + j)
        }
    };

    let (ox, oy) = (dx + lo, dy + lo);
    for j in 0..ch {
        for i in 0..cw {
            canvas.put_pixel(ox + i, oy + j, fetch(i, j));
        }
    }

    if expand == 0 {
        return;
    }

    // edge rows
    for i in 0..cw {
        let top = fetch(i, 0);
        let bottom = fetch(i, ch - 1);
        for k in 0..lo {
            canvas.put_pixel(ox + i, dy + k, top);
        }
        for k in 0..hi {
            canvas.put_pixel(ox + i, oy + ch + k, bottom);
        }
    }
    // edge columns
    for j in 0..ch {
        let left = fetch(0, j);
        let right = fetch(cw - 1, j);
        for k in 0..lo {
            canvas.put_pixel(dx + k, oy + j, left);
        }
        for k in 0..hi {
            canvas.put_pixel(ox + cw + k, oy + j, right);
        }
    }
    // corners
    fill(canvas, Rect::new(dx, dy, lo, lo), fetch(0, 0));
    fill(canvas, Rect::new(ox + cw, dy, hi, lo), fetch(cw - 1, 0));
    fill(canvas, Rect::new(ox + cw, oy + ch, hi, hi), fetch(cw - 1, ch - 1));
    fill(canvas, Rect::new(dx, oy + ch, lo, hi), fetch(0, ch - 1));
}

fn fill(canvas: &mut RgbaImage, area: Rect, color: Rgba<u8>) {
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Pixel buffer of one output texture.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Fully transparent `width`x`height` canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Draws the whole of `img` at (x, y).
    pub fn draw(&mut self, img: &RgbaImage, x: u32, y: u32, flip: bool, expand: u32) {
        let whole = Rect::new(0, 0, img.width(), img.height());
        blit_rgba(img, &mut self.image, x, y, whole, flip, expand);
    }

    /// Draws the `rect` part of `img` at (x, y).
    pub fn draw_rect(&mut self, img: &RgbaImage, rect: Rect, x: u32, y: u32, flip: bool, expand: u32) {
        blit_rgba(img, &mut self.image, x, y, rect, flip, expand);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x * 16 + y) as u8, 255]))
    }

    #[test]
    fn plain_copy_leaves_surroundings_untouched() {
        let src = numbered(3, 2);
        let mut canvas = Canvas::new(8, 8);
        canvas.draw(&src, 2, 3, false, 0);
        let img = canvas.image();
        for y in 0..8 {
            for x in 0..8 {
                let inside = (2..5).contains(&x) && (3..5).contains(&y);
                let px = *img.get_pixel(x, y);
                if inside {
                    assert_eq!(px, *src.get_pixel(x - 2, y - 3));
                } else {
                    assert_eq!(px, Rgba([0, 0, 0, 0]));
                }
            }
        }
    }

    #[test]
    fn flip_puts_right_column_on_top() {
        let src = numbered(3, 2);
        let mut canvas = Canvas::new(2, 3);
        canvas.draw(&src, 0, 0, true, 0);
        let img = canvas.image();
        assert_eq!(*img.get_pixel(0, 0), *src.get_pixel(2, 0));
        assert_eq!(*img.get_pixel(1, 0), *src.get_pixel(2, 1));
        assert_eq!(*img.get_pixel(0, 2), *src.get_pixel(0, 0));
        assert_eq!(*img.get_pixel(1, 2), *src.get_pixel(0, 1));
    }

    #[test]
    fn odd_expand_puts_extra_pixel_on_high_side() {
        let src = numbered(2, 2);
        let mut canvas = Canvas::new(5, 5);
        canvas.draw(&src, 0, 0, false, 3);
        let img = canvas.image();
        // one pixel low padding, two high
        assert_eq!(*img.get_pixel(1, 1), *src.get_pixel(0, 0));
        assert_eq!(*img.get_pixel(0, 0), *src.get_pixel(0, 0));
        assert_eq!(*img.get_pixel(4, 4), *src.get_pixel(1, 1));
        assert_eq!(*img.get_pixel(3, 4), *src.get_pixel(1, 1));
        assert_eq!(*img.get_pixel(4, 0), *src.get_pixel(1, 0));
        assert_eq!(*img.get_pixel(0, 4), *src.get_pixel(0, 1));
    }

    #[test]
    fn empty_rect_draws_nothing() {
        let src = numbered(4, 4);
        let mut canvas = Canvas::new(2, 2);
        canvas.draw_rect(&src, Rect::new(1, 1, 0, 3), 0, 0, false, 2);
        assert!(canvas.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    #[should_panic]
    fn fragment_past_canvas_edge_panics() {
        let src = numbered(4, 4);
        let mut canvas = Canvas::new(5, 5);
        canvas.draw(&src, 0, 0, false, 2);
    }

    #[test]
    #[should_panic]
    fn source_rect_outside_image_panics() {
        let src = numbered(4, 4);
        let mut canvas = Canvas::new(16, 16);
        canvas.draw_rect(&src, Rect::new(2, 2, 3, 3), 0, 0, false, 0);
    }
}
