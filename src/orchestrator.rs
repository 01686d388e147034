//! The generate → assemble → cleanup pipeline.
//!
//! [`Orchestrator::run`] executes three steps in strict order:
//!
//! 1. launch the generator and relay its output until it exits,
//! 2. discover its frames and encode them into the output video,
//! 3. delete the frames that went into the video.
//!
//! Any error stops the run. Cleanup happens only after the video was
//! written; if assembly fails the frames stay on disk for inspection.

use std::path::PathBuf;

use crate::{
    cleanup,
    encode::VideoEncoder,
    error::ReelError,
    generator::{self, ConsoleRelay, GeneratorReport, RelaySink},
    options::ReelOptions,
    sequence::FrameSequence,
    timeline::Timeline,
};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Generator outcome, or `None` if the generator was skipped.
    pub generator: Option<GeneratorReport>,
    /// Number of source frames assembled.
    pub frames: usize,
    /// Number of frames in the encoded video.
    pub encoded_frames: u64,
    /// Path of the written video.
    pub output: PathBuf,
    /// Number of source frames deleted afterwards.
    pub removed: usize,
}

/// Drives one run with fixed options.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    options: ReelOptions,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(options: ReelOptions) -> Self {
        Self { options }
    }

    /// The options this orchestrator runs with.
    pub fn options(&self) -> &ReelOptions {
        &self.options
    }

    /// Run the pipeline, printing generator output to the console.
    ///
    /// # Errors
    ///
    /// See [`run_with_relay`](Orchestrator::run_with_relay).
    pub fn run(&self) -> Result<RunSummary, ReelError> {
        self.run_with_relay(&mut ConsoleRelay)
    }

    /// Run the pipeline, relaying generator output to `sink`.
    ///
    /// # Errors
    ///
    /// - [`ReelError::Launch`] / [`ReelError::GeneratorFailed`] from the
    ///   generator step; nothing else is attempted.
    /// - [`ReelError::EmptyInput`], [`ReelError::MissingFrame`],
    ///   [`ReelError::Decode`], [`ReelError::Encode`], or
    ///   [`ReelError::Cancelled`] from assembly; frames are left in place.
    /// - [`ReelError::Cleanup`] if a frame cannot be deleted; the video is
    ///   complete regardless.
    pub fn run_with_relay<S: RelaySink + ?Sized>(&self, sink: &mut S) -> Result<RunSummary, ReelError> {
        let options = &self.options;
        let working_directory = options.working_directory()?;

        let generator = if options.run_generator {
            let executable = options.generator_path()?;
            let report = generator::run_generator(&executable, &working_directory, sink)?;
            generator::check_exit(&report, options.exit_policy)?;
            Some(report)
        } else {
            log::info!("Skipping generator; assembling existing frames");
            None
        };

        let images = options.images_path()?;
        let output = options.output_path()?;

        let frames = FrameSequence::discover(&images, &options.pattern)?;
        let timeline = Timeline::new(frames.len(), options.hold, options.frame_rate)?;

        let mut encoder = VideoEncoder::new(options.encoder.clone()).with_progress(options.progress.clone());
        if let Some(token) = &options.cancellation {
            encoder = encoder.with_cancellation(token.clone());
        }

        let encoded_frames = match encoder.write(&output, &frames, &timeline) {
            Ok(count) => count,
            Err(error) => {
                log::warn!(
                    "Assembly failed; leaving {} frame(s) in {}",
                    frames.len(),
                    frames.directory().display(),
                );
                return Err(error);
            }
        };

        let removed = if options.keep_frames {
            log::info!("Keeping {} frame(s) in {}", frames.len(), frames.directory().display());
            0
        } else {
            cleanup::remove_frames(frames.paths(), options.progress.clone())?
        };

        log::info!(
            "Wrote {} ({} source frame(s), {} encoded)",
            output.display(),
            frames.len(),
            encoded_frames,
        );

        Ok(RunSummary {
            generator,
            frames: frames.len(),
            encoded_frames,
            output,
            removed,
        })
    }
}
