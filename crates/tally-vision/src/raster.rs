use image::{Rgb as Px, RgbImage};
use tracing::debug;

use crate::annotate::{DrawOp, Rgb};
use crate::Point;

/// Paints rectangles and lines onto `img`, clipped to its bounds.
/// Text needs a font backend and is skipped.
pub fn paint(img: &mut RgbImage, ops: &[DrawOp]) {
    let mut skipped = 0usize;
    for op in ops {
        match op {
            DrawOp::Rect { from, to, color, thickness } => {
                rect(img, *from, *to, *color, *thickness)
            }
            DrawOp::Line { from, to, color, thickness } => {
                line(img, *from, *to, *color, *thickness)
            }
            DrawOp::Text { .. } => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "raster: text ops not rendered");
    }
}

pub fn blank(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

fn put(img: &mut RgbImage, x: i32, y: i32, c: Rgb) {
    if x < 0 || y < 0 { return; }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, Px([c.0, c.1, c.2]));
    }
}

fn rect(img: &mut RgbImage, a: Point, b: Point, c: Rgb, thickness: u32) {
    let (x1, x2) = (a.x.min(b.x), a.x.max(b.x));
    let (y1, y2) = (a.y.min(b.y), a.y.max(b.y));
    let t = thickness.max(1) as i32;
    for k in 0..t {
        for x in x1..=x2 {
            put(img, x, y1 + k, c);
            put(img, x, y2 - k, c);
        }
        for y in y1..=y2 {
            put(img, x1 + k, y, c);
            put(img, x2 - k, y, c);
        }
    }
}

// DDA walk; extra thickness grows across the major axis.
fn line(img: &mut RgbImage, a: Point, b: Point, c: Rgb, thickness: u32) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()).max(1);
    let t = thickness.max(1) as i32;
    let horizontal = dx.abs() >= dy.abs();
    for i in 0..=steps {
        let x = a.x + dx * i / steps;
        let y = a.y + dy * i / steps;
        for k in 0..t {
            if horizontal { put(img, x, y + k, c) } else { put(img, x + k, y, c) }
        }
    }
}
