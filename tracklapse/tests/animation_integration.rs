//! End-to-end rendering scenarios through the public API.

use chrono::{DateTime, TimeZone, Utc};
use image::Rgba;
use tokio_util::sync::CancellationToken;
use tracklapse::render::nearest_index;
use tracklapse::{AnimationConfig, GeoPoint, PalettedFrame, Track};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn count_color(frame: &PalettedFrame, color: [u8; 3]) -> usize {
    let idx = nearest_index(color[0], color[1], color[2]);
    frame.indices.iter().filter(|&&i| i == idx).count()
}

/// Two untimed tracks inside a unit bbox, margin 0.1, 256x256 canvas,
/// 5 frames: exactly 5 valid paletted 256x256 frames come back.
#[test]
fn end_to_end_untimed_animation() {
    let tracks = vec![
        Track::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.3, 0.4),
            GeoPoint::new(0.6, 0.7),
            GeoPoint::new(1.0, 1.0),
        ]),
        Track::new(vec![
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.5, 0.5),
            GeoPoint::new(1.0, 0.0),
        ]),
    ];

    let mut config = AnimationConfig::new(
        256,
        5,
        vec![Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])],
    );
    config.margin = 0.1;

    let cancel = CancellationToken::new();
    let animation = tracklapse::run(&tracks, &config, &cancel).unwrap();

    assert_eq!(animation.frames.len(), 5);
    for frame in &animation.frames {
        assert_eq!(frame.width, 256);
        assert_eq!(frame.height, 256);
        assert_eq!(frame.indices.len(), 256 * 256);
        assert_eq!(frame.delay_cs, tracklapse::render::DEFAULT_FRAME_DELAY_CS);
    }
    // Something was actually drawn by the final frame.
    assert!(count_color(animation.frames.last().unwrap(), [255, 0, 0]) > 0);
    assert!(count_color(animation.frames.last().unwrap(), [0, 255, 0]) > 0);
}

/// Index fallback with tracks of length 10 and 20 over 10 frames: the first
/// frame reveals less than the last, and the last frame reveals everything.
#[test]
fn index_fallback_reveals_monotonically() {
    let long: Vec<GeoPoint> = (0..20).map(|i| GeoPoint::new(i as f64 * 0.1, 0.2)).collect();
    let short: Vec<GeoPoint> = (0..10).map(|i| GeoPoint::new(i as f64 * 0.1, 0.8)).collect();
    let tracks = vec![Track::new(long), Track::new(short)];

    let config = AnimationConfig::new(
        256,
        10,
        vec![Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])],
    );
    let cancel = CancellationToken::new();
    let animation = tracklapse::run(&tracks, &config, &cancel).unwrap();
    assert_eq!(animation.frames.len(), 10);

    let first = &animation.frames[0];
    let last = &animation.frames[9];
    assert!(count_color(first, [255, 0, 0]) < count_color(last, [255, 0, 0]));

    // The last frame shows both tracks in full: rendering everything in one
    // frame produces the identical raster.
    let full_config = AnimationConfig::new(
        256,
        1,
        vec![Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])],
    );
    let full = tracklapse::run(&tracks, &full_config, &cancel).unwrap();
    assert_eq!(last.indices, full.frames[0].indices);
}

/// Time-synchronized mode: track A spans [t0, t10], track B spans [t0, t5].
/// At the midpoint of the global span B is fully drawn and held, while A is
/// only half-way.
#[test]
fn time_synchronized_two_tracks() {
    let a = Track::new(
        (0..11)
            .map(|i| GeoPoint::timed(i as f64 * 0.1, 0.0, ts(i)))
            .collect(),
    );
    let b = Track::new(
        (0..6)
            .map(|i| GeoPoint::timed(i as f64 * 0.1, 1.0, ts(i)))
            .collect(),
    );
    let tracks = vec![a, b];

    let config = AnimationConfig::new(
        256,
        11,
        vec![Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])],
    );
    let cancel = CancellationToken::new();
    let animation = tracklapse::run(&tracks, &config, &cancel).unwrap();
    assert_eq!(animation.frames.len(), 11);

    let mid = &animation.frames[5];
    let last = &animation.frames[10];

    let red_mid = count_color(mid, [255, 0, 0]);
    let red_last = count_color(last, [255, 0, 0]);
    assert!(red_mid > 0);
    assert!(
        red_mid < red_last,
        "track A should be partially drawn at the midpoint ({red_mid} vs {red_last})"
    );

    // Track B finished at the midpoint and holds its full path thereafter.
    let green_mid = count_color(mid, [0, 255, 0]);
    let green_last = count_color(last, [0, 255, 0]);
    assert!(green_mid > 0);
    assert_eq!(green_mid, green_last);
}

/// A cancelled run produces no frames, only a cancellation error.
#[test]
fn cancellation_yields_no_partial_output() {
    let tracks = vec![Track::new(vec![
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(1.0, 1.0),
    ])];
    let config = AnimationConfig::new(128, 5, vec![Rgba([255, 255, 255, 255])]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = tracklapse::run(&tracks, &config, &cancel);
    match result {
        Err(err) => assert!(err.is_cancelled()),
        Ok(_) => panic!("expected cancellation error"),
    }
}
