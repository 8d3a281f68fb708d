//! Fitting a raster onto a fixed canvas.

use image::{imageops, Rgba, RgbaImage};

/// How a basemap is fitted onto the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Scale to fit entirely inside the canvas, letterboxing with the
    /// background color.
    #[default]
    Contain,
    /// Scale to fill the canvas, cropping the overflow.
    Cover,
}

impl std::str::FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            other => Err(format!("unknown fit mode '{other}', expected contain | cover")),
        }
    }
}

/// Scales `src` onto a `width`×`height` canvas, preserving aspect ratio.
///
/// The scaled image is centered; contain mode fills the remainder with
/// `background`, cover mode lets the overflow clip. Resampling uses a
/// Catmull-Rom filter.
pub fn fit_to_canvas(
    src: &RgbaImage,
    width: u32,
    height: u32,
    mode: FitMode,
    background: Rgba<u8>,
) -> RgbaImage {
    let (src_w, src_h) = src.dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, background);
    if src_w == 0 || src_h == 0 {
        return canvas;
    }
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }

    let sx = f64::from(width) / f64::from(src_w);
    let sy = f64::from(height) / f64::from(src_h);
    let scale = match mode {
        FitMode::Contain => sx.min(sy),
        FitMode::Cover => sx.max(sy),
    };

    let scaled_w = ((f64::from(src_w) * scale).ceil() as u32).max(1);
    let scaled_h = ((f64::from(src_h) * scale).ceil() as u32).max(1);
    let scaled = imageops::resize(src, scaled_w, scaled_h, imageops::FilterType::CatmullRom);

    let off_x = (i64::from(width) - i64::from(scaled_w)) / 2;
    let off_y = (i64::from(height) - i64::from(scaled_h)) / 2;
    super::paste(&mut canvas, &scaled, off_x, off_y);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgba<u8> = Rgba([9, 9, 9, 255]);
    const FILL: Rgba<u8> = Rgba([200, 100, 50, 255]);

    #[test]
    fn test_fit_mode_from_str() {
        assert_eq!("contain".parse::<FitMode>().unwrap(), FitMode::Contain);
        assert_eq!(" Cover ".parse::<FitMode>().unwrap(), FitMode::Cover);
        assert!("stretch".parse::<FitMode>().is_err());
    }

    #[test]
    fn test_contain_letterboxes_wide_source() {
        let src = RgbaImage::from_pixel(100, 50, FILL);
        let out = fit_to_canvas(&src, 100, 100, FitMode::Contain, BG);
        assert_eq!(out.dimensions(), (100, 100));
        // Letterbox bands above and below keep the background color.
        assert_eq!(out.get_pixel(50, 2).0, BG.0);
        assert_eq!(out.get_pixel(50, 97).0, BG.0);
        assert_eq!(out.get_pixel(50, 50).0, FILL.0);
    }

    #[test]
    fn test_cover_fills_whole_canvas() {
        let src = RgbaImage::from_pixel(100, 50, FILL);
        let out = fit_to_canvas(&src, 100, 100, FitMode::Cover, BG);
        // Every pixel comes from the (clipped) source.
        for &corner in &[(0u32, 0u32), (99, 0), (0, 99), (99, 99), (50, 50)] {
            assert_eq!(out.get_pixel(corner.0, corner.1).0, FILL.0);
        }
    }

    #[test]
    fn test_exact_size_passthrough() {
        let src = RgbaImage::from_pixel(64, 64, FILL);
        let out = fit_to_canvas(&src, 64, 64, FitMode::Contain, BG);
        assert_eq!(out, src);
    }

    #[test]
    fn test_empty_source_yields_background() {
        let src = RgbaImage::new(0, 0);
        let out = fit_to_canvas(&src, 16, 16, FitMode::Contain, BG);
        assert!(out.pixels().all(|p| p.0 == BG.0));
    }
}
