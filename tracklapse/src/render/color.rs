//! Hex color parsing.

use image::Rgba;
use thiserror::Error;

/// Errors from hex color parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("hex color must start with '#': {0}")]
    MissingHash(String),

    #[error("hex color must be #RRGGBB or #AARRGGBB: {0}")]
    BadFormat(String),
}

/// Parses `#RRGGBB` or `#AARRGGBB` into an RGBA color.
pub fn parse_hex_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let trimmed = s.trim();
    let Some(hex) = trimmed.strip_prefix('#') else {
        return Err(ColorError::MissingHash(trimmed.to_string()));
    };
    if !hex.is_ascii() {
        return Err(ColorError::BadFormat(trimmed.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| ColorError::BadFormat(trimmed.to_string()))
    };
    match hex.len() {
        6 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 0xFF])),
        8 => {
            let a = channel(0)?;
            Ok(Rgba([channel(2)?, channel(4)?, channel(6)?, a]))
        }
        _ => Err(ColorError::BadFormat(trimmed.to_string())),
    }
}

/// Parses a comma-separated list of hex colors.
///
/// An empty input yields an empty list; whether that is acceptable is the
/// caller's configuration concern.
pub fn parse_hex_colors(csv: &str) -> Result<Vec<Rgba<u8>>, ColorError> {
    let csv = csv.trim();
    if csv.is_empty() {
        return Ok(Vec::new());
    }
    csv.split(',').map(parse_hex_color).collect()
}
