//! Error types for the `huegene-reel` crate.
//!
//! [`ReelError`] is the single error type returned by every fallible
//! operation. Each pipeline step has its own variants so callers can tell
//! a launch failure from a decode failure without parsing messages.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `huegene-reel` operations.
///
/// Every step of the pipeline is fatal: once a `ReelError` is returned the
/// remaining steps are not attempted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReelError {
    /// The generator executable could not be found or started.
    #[error("Failed to launch generator at {path}: {source}")]
    Launch {
        /// Resolved path of the executable.
        path: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: IoError,
    },

    /// The generator exited unsuccessfully and the exit policy is
    /// [`ExitPolicy::Abort`](crate::ExitPolicy::Abort).
    #[error("Generator exited unsuccessfully (code: {code:?})")]
    GeneratorFailed {
        /// Exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
    },

    /// The frame directory is missing or contains no frames.
    #[error("No frames to assemble in {directory}: {reason}")]
    EmptyInput {
        /// Directory that was inspected.
        directory: PathBuf,
        /// Why no frames were found.
        reason: String,
    },

    /// A frame index below the frame count has no file.
    #[error("Frame {index} is missing: expected {path}")]
    MissingFrame {
        /// Index that has no file.
        index: usize,
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// A frame file could not be read as an image.
    #[error("Failed to decode frame {path}: {source}")]
    Decode {
        /// The unreadable frame.
        path: PathBuf,
        /// Error reported by the `image` crate.
        #[source]
        source: ImageError,
    },

    /// FFmpeg could not encode or write the output video.
    #[error("Video encoding error: {0}")]
    Encode(String),

    /// A consumed frame could not be deleted after a successful encode.
    #[error("Failed to remove frame {path}: {source}")]
    Cleanup {
        /// Frame that could not be deleted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// The per-frame hold duration was zero.
    #[error("Hold duration must be greater than zero")]
    InvalidHoldDuration,

    /// The output frame rate was zero.
    #[error("Frame rate must be greater than zero")]
    InvalidFrameRate,

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error outside the cases above.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<FfmpegError> for ReelError {
    fn from(error: FfmpegError) -> Self {
        ReelError::Ffmpeg(error.to_string())
    }
}
