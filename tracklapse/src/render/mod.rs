//! Frame renderer
//!
//! Converts N tracks into a fixed number of animation frames with a
//! consistent temporal meaning across tracks of different length, sampling
//! rate, and time range.
//!
//! When any point carries a timestamp, frames sample the global time span
//! uniformly and each track reveals itself up to the frame's instant via a
//! monotonic cursor. Without timestamps, pacing falls back to point
//! indices, keyed to the longest track.
//!
//! Frames are produced strictly in order: the cursor vector is advanced in
//! place from frame to frame, which is what makes the whole pass
//! O(total points + frame_count × track_count).

mod color;
mod draw;
mod palette;

pub use color::{parse_hex_color, parse_hex_colors, ColorError};
pub use palette::{global_palette, global_palette_rgb, nearest_index, quantize, PALETTE_SIZE};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::track::{global_time_span, BoundingBox, GeoPoint, TimeSpan, Track};

/// Default per-frame display time in hundredths of a second (~20 fps).
pub const DEFAULT_FRAME_DELAY_CS: u16 = 5;

/// Errors from frame rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no points in any input track")]
    EmptyInput,

    #[error("track color list is empty")]
    NoTrackColors,

    #[error("operation cancelled")]
    Cancelled,
}

/// Options controlling one render pass.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Edge length of the square output canvas in pixels.
    pub canvas_size: u32,
    /// Number of frames to produce (bumped to 2 in time-paced mode).
    pub frame_count: usize,
    /// Fraction of the bounding box span added on each side.
    pub margin: f64,
    /// Fill color where no basemap pixel exists.
    pub background: Rgba<u8>,
    /// Track colors, assigned round-robin by track index.
    pub track_colors: Vec<Rgba<u8>>,
    /// Polyline brush width in pixels.
    pub line_width: u32,
    /// Display duration per frame in hundredths of a second.
    pub frame_delay_cs: u16,
}

/// One output frame: palette indices over the shared global palette.
#[derive(Debug, Clone)]
pub struct PalettedFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major indices into [`global_palette`].
    pub indices: Vec<u8>,
    /// Display duration in hundredths of a second.
    pub delay_cs: u16,
}

/// Renders the full frame sequence for the given tracks.
///
/// The shared bounding box is folded from every track and expanded by the
/// margin; `basemap`, when present, must already be sized to the canvas.
/// Cancellation is checked before each frame; a begun frame completes and
/// partial output is discarded on cancellation.
pub fn render_frames(
    tracks: &[Track],
    options: &RenderOptions,
    basemap: Option<&RgbaImage>,
    cancel: &CancellationToken,
) -> Result<Vec<PalettedFrame>, RenderError> {
    if options.track_colors.is_empty() {
        return Err(RenderError::NoTrackColors);
    }
    let bbox = BoundingBox::from_tracks(tracks)
        .ok_or(RenderError::EmptyInput)?
        .expanded(options.margin);

    match global_time_span(tracks) {
        Some(span) => {
            debug!(start = %span.start, end = %span.end, "rendering time-paced frames");
            render_time_paced(tracks, &bbox, span, options, basemap, cancel)
        }
        None => {
            debug!("no timestamps found, rendering index-paced frames");
            render_index_paced(tracks, &bbox, options, basemap, cancel)
        }
    }
}

/// Index-based pacing: the longest track sets the tempo and shorter tracks
/// finish early, holding their final shape.
fn render_index_paced(
    tracks: &[Track],
    bbox: &BoundingBox,
    options: &RenderOptions,
    basemap: Option<&RgbaImage>,
    cancel: &CancellationToken,
) -> Result<Vec<PalettedFrame>, RenderError> {
    let max_len = tracks.iter().map(Track::len).max().unwrap_or(0).max(2);
    let frame_count = options.frame_count.max(1);
    let step = (((max_len - 1) as f64) / frame_count as f64).max(1.0);

    let mut frames = Vec::with_capacity(frame_count);
    for frame_idx in 0..frame_count {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        let upto = (step * (frame_idx + 1) as f64).round() as usize;

        let mut canvas = base_canvas(options, basemap);
        for (track_idx, track) in tracks.iter().enumerate() {
            if track.len() < 2 {
                continue;
            }
            let end = upto.min(track.len() - 1);
            draw_revealed(&mut canvas, &track.points, end, bbox, track_idx, options);
        }
        frames.push(finish_frame(canvas, options));
    }
    Ok(frames)
}

/// Time-based pacing: frames sample the global span uniformly, the last
/// frame pinned exactly to its end.
fn render_time_paced(
    tracks: &[Track],
    bbox: &BoundingBox,
    span: TimeSpan,
    options: &RenderOptions,
    basemap: Option<&RgbaImage>,
    cancel: &CancellationToken,
) -> Result<Vec<PalettedFrame>, RenderError> {
    let frame_count = options.frame_count.max(2);
    let total_micros = span.duration().num_microseconds().unwrap_or(i64::MAX);

    // One reveal cursor per track, advanced monotonically across the
    // sequential frame loop.
    let mut cursors = vec![0usize; tracks.len()];

    let mut frames = Vec::with_capacity(frame_count);
    for frame_idx in 0..frame_count {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        let instant = frame_instant(span, total_micros, frame_idx, frame_count);
        let canvas = compose_timed_frame(tracks, bbox, instant, &mut cursors, options, basemap);
        frames.push(finish_frame(canvas, options));
    }
    Ok(frames)
}

/// Nominal instant of frame `frame_idx`, with the final frame pinned to the
/// span's end to eliminate rounding drift.
fn frame_instant(
    span: TimeSpan,
    total_micros: i64,
    frame_idx: usize,
    frame_count: usize,
) -> DateTime<Utc> {
    if frame_idx == frame_count - 1 {
        return span.end;
    }
    let offset = total_micros as f64 * frame_idx as f64 / (frame_count - 1) as f64;
    span.start + ChronoDuration::microseconds(offset as i64)
}

/// Builds one time-paced frame, advancing the per-track cursors in place.
fn compose_timed_frame(
    tracks: &[Track],
    bbox: &BoundingBox,
    instant: DateTime<Utc>,
    cursors: &mut [usize],
    options: &RenderOptions,
    basemap: Option<&RgbaImage>,
) -> RgbaImage {
    let mut canvas = base_canvas(options, basemap);
    for (track_idx, track) in tracks.iter().enumerate() {
        if track.len() < 2 {
            continue;
        }
        cursors[track_idx] = advance_cursor(&track.points, cursors[track_idx], instant);
        let end = cursors[track_idx];
        if end < 1 {
            // This track has not started yet relative to the frame instant.
            continue;
        }
        draw_revealed(&mut canvas, &track.points, end, bbox, track_idx, options);
    }
    canvas
}

/// Advances a cursor to the last point whose timestamp is at or before the
/// frame instant.
///
/// A point without a timestamp never satisfies the bound, so it blocks
/// further advancement; a fully consumed track simply stays at its final
/// index (trailing hold).
fn advance_cursor(points: &[GeoPoint], cursor: usize, instant: DateTime<Utc>) -> usize {
    let mut i = cursor;
    while i + 1 < points.len() {
        match points[i + 1].time {
            Some(t) if t <= instant => i += 1,
            _ => break,
        }
    }
    i
}

/// Draws segments up to (and including the one ending at) `end`.
fn draw_revealed(
    canvas: &mut RgbaImage,
    points: &[GeoPoint],
    end: usize,
    bbox: &BoundingBox,
    track_idx: usize,
    options: &RenderOptions,
) {
    let color = options.track_colors[track_idx % options.track_colors.len()];
    for k in 0..end {
        let (x0, y0) = project_point(&points[k], bbox, options.canvas_size);
        let (x1, y1) = project_point(&points[k + 1], bbox, options.canvas_size);
        draw::draw_line(canvas, x0, y0, x1, y1, options.line_width, color);
    }
}

/// Linear projection of a point into canvas pixels via the shared bounding
/// box, clamped to the canvas.
fn project_point(point: &GeoPoint, bbox: &BoundingBox, size: u32) -> (i32, i32) {
    let xf = if bbox.lon_span() > 0.0 {
        (point.lon - bbox.min_lon) / bbox.lon_span()
    } else {
        0.0
    };
    let yf = if bbox.lat_span() > 0.0 {
        1.0 - (point.lat - bbox.min_lat) / bbox.lat_span()
    } else {
        0.0
    };
    let max = f64::from(size - 1);
    let x = (xf * max).round().clamp(0.0, max) as i32;
    let y = (yf * max).round().clamp(0.0, max) as i32;
    (x, y)
}

/// Starts a frame from the basemap or the solid background color.
fn base_canvas(options: &RenderOptions, basemap: Option<&RgbaImage>) -> RgbaImage {
    match basemap {
        Some(base) => base.clone(),
        None => RgbaImage::from_pixel(
            options.canvas_size,
            options.canvas_size,
            options.background,
        ),
    }
}

/// Quantizes a finished canvas into an output frame.
fn finish_frame(canvas: RgbaImage, options: &RenderOptions) -> PalettedFrame {
    PalettedFrame {
        width: canvas.width(),
        height: canvas.height(),
        indices: quantize(&canvas),
        delay_cs: options.frame_delay_cs,
    }
}
