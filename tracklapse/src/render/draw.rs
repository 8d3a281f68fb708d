//! Polyline rasterization: Bresenham stepping with a square brush.

use image::{Rgba, RgbaImage};

/// Draws a line of the given brush width between two canvas points.
///
/// Endpoints may lie outside the canvas; out-of-bounds pixels are clipped.
pub fn draw_line(
    img: &mut RgbaImage,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    width: u32,
    color: Rgba<u8>,
) {
    let (mut x, mut y) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot_square(img, x, y, width, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Stamps a `width`-sized square centered on `(cx, cy)`.
fn plot_square(img: &mut RgbaImage, cx: i32, cy: i32, width: u32, color: Rgba<u8>) {
    if width <= 1 {
        put_clipped(img, cx, cy, color);
        return;
    }
    let r = ((width - 1) / 2) as i32;
    for y in (cy - r)..=(cy + r) {
        for x in (cx - r)..=(cx + r) {
            put_clipped(img, x, y, color);
        }
    }
}

fn put_clipped(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}
