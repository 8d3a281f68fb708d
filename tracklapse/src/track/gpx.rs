//! GPX file loading.
//!
//! Reads a GPX document and flattens every track segment it contains into a
//! single [`Track`], preserving recording order. Point timestamps are
//! converted to UTC when present.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{GeoPoint, Track};

/// Errors raised while loading a GPX file.
#[derive(Debug, Error)]
pub enum GpxError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Loads all track points from a GPX file.
///
/// Every `<trkseg>` of every `<trk>` is flattened into one point sequence;
/// the file is one logical track for animation purposes.
pub fn load_track(path: &Path) -> Result<Track, GpxError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| GpxError::Open {
        path: display.clone(),
        source,
    })?;

    let document = ::gpx::read(BufReader::new(file)).map_err(|e| GpxError::Parse {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let mut points = Vec::new();
    for track in document.tracks {
        for segment in track.segments {
            for waypoint in segment.points {
                let time = match waypoint.time {
                    Some(t) => Some(convert_time(t, &display)?),
                    None => None,
                };
                let position = waypoint.point();
                points.push(GeoPoint {
                    lat: position.y(),
                    lon: position.x(),
                    time,
                });
            }
        }
    }
    Ok(Track::new(points))
}

/// Converts a GPX timestamp to `DateTime<Utc>` via its RFC 3339 rendering.
fn convert_time(time: ::gpx::Time, path: &str) -> Result<DateTime<Utc>, GpxError> {
    let iso = time.format().map_err(|e| GpxError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    DateTime::parse_from_rfc3339(&iso)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GpxError::Parse {
            path: path.to_string(),
            reason: format!("bad point timestamp {iso}: {e}"),
        })
}
