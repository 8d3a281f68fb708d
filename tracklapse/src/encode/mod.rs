//! Animated GIF encoding
//!
//! Writes the paletted frame sequence as a looping GIF. File output goes
//! through a `.part` temporary that is atomically renamed on success and
//! removed on error or cancellation, so a truncated GIF is never left
//! behind.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gif::{Encoder, Frame, Repeat};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::render::{global_palette_rgb, PalettedFrame};

/// Errors from GIF encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no frames to encode")]
    NoFrames,

    #[error("frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    MismatchedFrame {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("GIF encoding failed: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

fn encoding_error(e: gif::EncodingError) -> EncodeError {
    EncodeError::Encoding(e.to_string())
}

/// Encodes the frame sequence into `writer` as an infinitely looping GIF.
///
/// `on_frame` is invoked after each frame is written, for progress
/// reporting. Cancellation is checked before each frame.
pub fn write_gif<W: Write>(
    writer: W,
    frames: &[PalettedFrame],
    cancel: &CancellationToken,
    mut on_frame: impl FnMut(usize),
) -> Result<(), EncodeError> {
    let first = frames.first().ok_or(EncodeError::NoFrames)?;
    let palette = global_palette_rgb();

    let mut encoder = Encoder::new(writer, first.width as u16, first.height as u16, &palette)
        .map_err(encoding_error)?;
    encoder.set_repeat(Repeat::Infinite).map_err(encoding_error)?;

    for (index, frame) in frames.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }
        if frame.width != first.width || frame.height != first.height {
            return Err(EncodeError::MismatchedFrame {
                index,
                width: frame.width,
                height: frame.height,
                expected_width: first.width,
                expected_height: first.height,
            });
        }

        let mut gif_frame = Frame::default();
        gif_frame.width = frame.width as u16;
        gif_frame.height = frame.height as u16;
        gif_frame.buffer = Cow::Borrowed(&frame.indices);
        gif_frame.delay = frame.delay_cs;
        encoder.write_frame(&gif_frame).map_err(encoding_error)?;
        on_frame(index);
    }
    Ok(())
}

/// Encodes the frame sequence into a file.
///
/// Writes to `<path>.part` first and renames into place; the temporary is
/// removed on any failure.
pub fn write_gif_file(
    path: &Path,
    frames: &[PalettedFrame],
    cancel: &CancellationToken,
    on_frame: impl FnMut(usize),
) -> Result<(), EncodeError> {
    let tmp = part_path(path);
    let result: Result<(), EncodeError> = (|| {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        write_gif(&mut writer, frames, cancel, on_frame)?;
        writer.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&tmp, path)?;
            info!(path = %path.display(), frames = frames.len(), "GIF written");
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&tmp);
            Err(err)
        }
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".part");
    PathBuf::from(os)
}
