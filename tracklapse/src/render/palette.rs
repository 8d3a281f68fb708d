//! Fixed 256-color palette and Floyd–Steinberg quantization.
//!
//! The palette is a 6×6×6 color cube (216 entries) followed by a 40-step
//! gray ramp. Both regions admit a constant-time nearest-entry formula, so
//! quantizing a frame is O(pixels) with no palette scan.

use image::RgbaImage;
use std::sync::OnceLock;

/// Entries in the fixed palette.
pub const PALETTE_SIZE: usize = 256;

/// Color-cube entries (6 levels per channel).
const CUBE_SIZE: usize = 216;

/// Gray-ramp entries following the cube.
const GRAY_LEVELS: usize = PALETTE_SIZE - CUBE_SIZE;

/// The fixed palette shared by every frame of a run.
pub fn global_palette() -> &'static [[u8; 3]; PALETTE_SIZE] {
    static PALETTE: OnceLock<[[u8; 3]; PALETTE_SIZE]> = OnceLock::new();
    PALETTE.get_or_init(|| {
        let mut palette = [[0u8; 3]; PALETTE_SIZE];
        let mut i = 0;
        for r in 0..6 {
            for g in 0..6 {
                for b in 0..6 {
                    palette[i] = [cube_value(r), cube_value(g), cube_value(b)];
                    i += 1;
                }
            }
        }
        for k in 0..GRAY_LEVELS {
            let v = gray_value(k);
            palette[i] = [v, v, v];
            i += 1;
        }
        palette
    })
}

/// The palette flattened to `R,G,B,R,G,B,…` for GIF encoders.
pub fn global_palette_rgb() -> Vec<u8> {
    global_palette().iter().flatten().copied().collect()
}

/// Cube channel value for a level in `0..6`.
fn cube_value(level: usize) -> u8 {
    (level * 255 / 5) as u8
}

/// Gray value for a ramp step in `0..GRAY_LEVELS`.
fn gray_value(step: usize) -> u8 {
    ((step * 255 + (GRAY_LEVELS - 1) / 2) / (GRAY_LEVELS - 1)) as u8
}

/// Nearest cube level for a channel value.
fn nearest_cube_level(v: u8) -> usize {
    ((usize::from(v) * 5 + 127) / 255).min(5)
}

/// Nearest gray step for a luminance value.
fn nearest_gray_step(v: u8) -> usize {
    ((usize::from(v) * (GRAY_LEVELS - 1) + 127) / 255).min(GRAY_LEVELS - 1)
}

fn distance_sq(a: [u8; 3], r: i32, g: i32, b: i32) -> i32 {
    let dr = i32::from(a[0]) - r;
    let dg = i32::from(a[1]) - g;
    let db = i32::from(a[2]) - b;
    dr * dr + dg * dg + db * db
}

/// Index of the palette entry nearest to an RGB color.
pub fn nearest_index(r: u8, g: u8, b: u8) -> u8 {
    let palette = global_palette();

    let cube_idx =
        36 * nearest_cube_level(r) + 6 * nearest_cube_level(g) + nearest_cube_level(b);
    let lum = (u32::from(r) + u32::from(g) + u32::from(b)) / 3;
    let gray_idx = CUBE_SIZE + nearest_gray_step(lum as u8);

    let (ri, gi, bi) = (i32::from(r), i32::from(g), i32::from(b));
    if distance_sq(palette[gray_idx], ri, gi, bi) < distance_sq(palette[cube_idx], ri, gi, bi) {
        gray_idx as u8
    } else {
        cube_idx as u8
    }
}

/// Quantizes a frame to the fixed palette with Floyd–Steinberg dithering.
///
/// Returns one palette index per pixel in row-major order. Alpha is
/// ignored; frames are composited before quantization.
pub fn quantize(img: &RgbaImage) -> Vec<u8> {
    let (w, h) = img.dimensions();
    let (w_us, h_us) = (w as usize, h as usize);
    let palette = global_palette();

    // Working buffer in f32 so diffused error can go negative.
    let mut channels = vec![0.0f32; w_us * h_us * 3];
    for (i, pixel) in img.pixels().enumerate() {
        channels[i * 3] = f32::from(pixel.0[0]);
        channels[i * 3 + 1] = f32::from(pixel.0[1]);
        channels[i * 3 + 2] = f32::from(pixel.0[2]);
    }

    let mut indices = vec![0u8; w_us * h_us];
    for y in 0..h_us {
        for x in 0..w_us {
            let pos = y * w_us + x;
            let r = channels[pos * 3].clamp(0.0, 255.0);
            let g = channels[pos * 3 + 1].clamp(0.0, 255.0);
            let b = channels[pos * 3 + 2].clamp(0.0, 255.0);

            let index = nearest_index(r as u8, g as u8, b as u8);
            indices[pos] = index;

            let chosen = palette[usize::from(index)];
            let err = [
                r - f32::from(chosen[0]),
                g - f32::from(chosen[1]),
                b - f32::from(chosen[2]),
            ];

            let mut diffuse = |dx: i64, dy: i64, factor: f32| {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || nx >= w_us as i64 || ny >= h_us as i64 {
                    return;
                }
                let npos = (ny as usize * w_us + nx as usize) * 3;
                for c in 0..3 {
                    channels[npos + c] += err[c] * factor;
                }
            };
            diffuse(1, 0, 7.0 / 16.0);
            diffuse(-1, 1, 3.0 / 16.0);
            diffuse(0, 1, 5.0 / 16.0);
            diffuse(1, 1, 1.0 / 16.0);
        }
    }
    indices
}
