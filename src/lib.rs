//! # huegene-reel
//!
//! Run the Huegene image generator and turn the bitmaps it produces into an
//! MP4 video.
//!
//! A run has three steps:
//!
//! 1. **Generate** — launch the generator next to the binary and relay its
//!    console output live.
//! 2. **Assemble** — read `Images/Image0.bmp`, `Image1.bmp`, … in numeric
//!    order, hold each for 30 ms on a timeline, and encode that timeline at
//!    24 fps into `test.mp4` with FFmpeg via
//!    [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next).
//! 3. **Clean up** — delete the bitmaps that went into the video.
//!
//! ## Quick Start
//!
//! ```no_run
//! use huegene_reel::{Orchestrator, ReelOptions};
//!
//! let summary = Orchestrator::new(ReelOptions::new()).run()?;
//! println!("{} frames -> {}", summary.frames, summary.output.display());
//! # Ok::<(), huegene_reel::ReelError>(())
//! ```
//!
//! Each step is also usable on its own: [`run_generator`],
//! [`FrameSequence::discover`], [`Timeline`], [`VideoEncoder`], and
//! [`remove_frames`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and an H.264
//! encoder must be available at runtime for the default codec.

pub mod cleanup;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod generator;
pub mod options;
pub mod orchestrator;
pub mod progress;
pub mod sequence;
pub mod timeline;

pub use cleanup::remove_frames;
pub use encode::{VideoCodec, VideoEncoder, VideoEncoderOptions};
pub use error::ReelError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use generator::{
    CapturedRelay, ConsoleRelay, ExitPolicy, GeneratorReport, RelaySink, check_exit, run_generator,
};
pub use options::ReelOptions;
pub use orchestrator::{Orchestrator, RunSummary};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sequence::{FramePattern, FrameSequence};
pub use timeline::Timeline;
