//! Tracklapse - time-synchronized GPS track animations
//!
//! This library turns one or more GPS tracks into an animated GIF, optionally
//! over a slippy-map tile background. The two load-bearing subsystems are the
//! tile acquisition/mosaic pipeline ([`fetch`] + [`mosaic`]) and the
//! multi-track, time-synchronized frame renderer ([`render`]); [`app`] wires
//! them together behind an explicit configuration record.

pub mod app;
pub mod coord;
pub mod encode;
pub mod fetch;
pub mod logging;
pub mod mosaic;
pub mod provider;
pub mod render;
pub mod track;

pub use app::{run, Animation, AnimationConfig, AppError, BasemapSource, TileSettings};
pub use render::PalettedFrame;
pub use track::{BoundingBox, GeoPoint, Track};
