//! Track domain types
//!
//! A [`Track`] is an ordered sequence of [`GeoPoint`]s in recording order;
//! temporal monotonicity is assumed, not verified. The shared
//! [`BoundingBox`] and optional global [`TimeSpan`] drive both the basemap
//! mosaic and the frame renderer.

pub mod gpx;

use chrono::{DateTime, Utc};

/// A single recorded position, with an optional capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<DateTime<Utc>>,
}

impl GeoPoint {
    /// Creates an untimed point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            time: None,
        }
    }

    /// Creates a point with a capture timestamp.
    pub fn timed(lat: f64, lon: f64, time: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            time: Some(time),
        }
    }
}

/// An ordered sequence of recorded positions from one input source.
///
/// Zero-length and single-point tracks are valid; they render nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub points: Vec<GeoPoint>,
}

impl Track {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Geographic extent of one or more tracks.
///
/// Invariant: `min_lat <= max_lat` and `min_lon <= max_lon`. Computed once
/// per run and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Folds the extent of a point sequence; `None` for an empty sequence.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lat = bbox.max_lat.max(p.lat);
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.max_lon = bbox.max_lon.max(p.lon);
        }
        Some(bbox)
    }

    /// Folds the extents of all tracks; `None` when no track has a point.
    pub fn from_tracks(tracks: &[Track]) -> Option<Self> {
        tracks
            .iter()
            .filter_map(|t| Self::from_points(&t.points))
            .reduce(|a, b| a.union(&b))
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        BoundingBox {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Expands the box by a fraction of its own span on every side.
    ///
    /// A degenerate (zero-span) box is returned unchanged.
    pub fn expanded(&self, margin: f64) -> Self {
        let pad_lat = (self.max_lat - self.min_lat) * margin;
        let pad_lon = (self.max_lon - self.min_lon) * margin;
        BoundingBox {
            min_lat: self.min_lat - pad_lat,
            max_lat: self.max_lat + pad_lat,
            min_lon: self.min_lon - pad_lon,
            max_lon: self.max_lon + pad_lon,
        }
    }

    /// Latitude span in degrees.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Global time range covered by timestamped points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Scans every point of every track for the min/max timestamp.
///
/// Returns `None` when no point carries a timestamp, which switches the
/// renderer to index-based pacing.
pub fn global_time_span(tracks: &[Track]) -> Option<TimeSpan> {
    let mut span: Option<TimeSpan> = None;
    for track in tracks {
        for point in &track.points {
            let Some(t) = point.time else { continue };
            span = Some(match span {
                None => TimeSpan { start: t, end: t },
                Some(s) => TimeSpan {
                    start: s.start.min(t),
                    end: s.end.max(t),
                },
            });
        }
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_bbox_from_points() {
        let points = vec![
            GeoPoint::new(10.0, -5.0),
            GeoPoint::new(12.0, -7.0),
            GeoPoint::new(11.0, -6.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.min_lat, 10.0);
        assert_eq!(bbox.max_lat, 12.0);
        assert_eq!(bbox.min_lon, -7.0);
        assert_eq!(bbox.max_lon, -5.0);
    }

    #[test]
    fn test_bbox_from_empty_points() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_bbox_from_tracks_folds_all() {
        let tracks = vec![
            Track::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]),
            Track::new(vec![]),
            Track::new(vec![GeoPoint::new(-2.0, 3.0)]),
        ];
        let bbox = BoundingBox::from_tracks(&tracks).unwrap();
        assert_eq!(bbox.min_lat, -2.0);
        assert_eq!(bbox.max_lat, 1.0);
        assert_eq!(bbox.min_lon, 0.0);
        assert_eq!(bbox.max_lon, 3.0);
    }

    #[test]
    fn test_bbox_from_tracks_all_empty() {
        let tracks = vec![Track::default(), Track::default()];
        assert!(BoundingBox::from_tracks(&tracks).is_none());
    }

    #[test]
    fn test_bbox_expanded() {
        let bbox = BoundingBox {
            min_lat: 0.0,
            max_lat: 10.0,
            min_lon: 20.0,
            max_lon: 30.0,
        };
        let expanded = bbox.expanded(0.1);
        assert!((expanded.min_lat - -1.0).abs() < 1e-9);
        assert!((expanded.max_lat - 11.0).abs() < 1e-9);
        assert!((expanded.min_lon - 19.0).abs() < 1e-9);
        assert!((expanded.max_lon - 31.0).abs() < 1e-9);
    }

    #[test]
    fn test_bbox_expanded_degenerate() {
        let bbox = BoundingBox {
            min_lat: 5.0,
            max_lat: 5.0,
            min_lon: 5.0,
            max_lon: 5.0,
        };
        assert_eq!(bbox.expanded(0.25), bbox);
    }

    #[test]
    fn test_global_time_span_across_tracks() {
        let tracks = vec![
            Track::new(vec![
                GeoPoint::timed(0.0, 0.0, ts(100)),
                GeoPoint::new(0.1, 0.1),
                GeoPoint::timed(0.2, 0.2, ts(250)),
            ]),
            Track::new(vec![GeoPoint::timed(1.0, 1.0, ts(50))]),
        ];
        let span = global_time_span(&tracks).unwrap();
        assert_eq!(span.start, ts(50));
        assert_eq!(span.end, ts(250));
        assert_eq!(span.duration(), chrono::Duration::seconds(200));
    }

    #[test]
    fn test_global_time_span_absent_without_timestamps() {
        let tracks = vec![Track::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
        ])];
        assert!(global_time_span(&tracks).is_none());
    }
}
