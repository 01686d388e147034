//! Run configuration.
//!
//! [`ReelOptions`] is a builder that carries every path, name, and timing
//! knob the [`Orchestrator`](crate::Orchestrator) needs. Defaults reproduce
//! the stock layout: `Huegene` next to the binary, frames in
//! `Images/Image<N>.bmp`, output `test.mp4`, 30 ms per frame at 24 fps.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use huegene_reel::{ExitPolicy, ReelOptions};
//!
//! let options = ReelOptions::new()
//!     .with_install_root("/opt/huegene")
//!     .with_working_directory("/tmp/run")
//!     .with_hold(Duration::from_millis(40))
//!     .with_exit_policy(ExitPolicy::Abort);
//! ```

use std::{
    env,
    fmt::{Debug, Formatter, Result as FmtResult},
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    encode::VideoEncoderOptions,
    error::ReelError,
    generator::ExitPolicy,
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
    sequence::FramePattern,
};

/// File name of the generator executable.
#[cfg(windows)]
pub const DEFAULT_GENERATOR: &str = "Huegene.exe";
/// File name of the generator executable.
#[cfg(not(windows))]
pub const DEFAULT_GENERATOR: &str = "Huegene";

/// Directory the generator writes its frames into.
pub const DEFAULT_IMAGES_DIRECTORY: &str = "Images";

/// Output video written into the working directory.
pub const DEFAULT_OUTPUT: &str = "test.mp4";

/// Time each frame stays on screen.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(30);

/// Playback frame rate of the output video.
pub const DEFAULT_FRAME_RATE: u32 = 24;

/// Configuration for one generate → assemble → cleanup run.
///
/// Relative `images_directory` and `output` paths are resolved against the
/// working directory; a relative `generator` is resolved against the
/// install root.
#[derive(Clone)]
pub struct ReelOptions {
    /// Directory holding the generator. `None` means the directory of the
    /// running binary.
    pub(crate) install_root: Option<PathBuf>,
    /// Generator executable, relative to the install root.
    pub(crate) generator: PathBuf,
    /// Working directory for the generator, frames, and output. `None`
    /// means the current directory.
    pub(crate) working_directory: Option<PathBuf>,
    /// Frame directory.
    pub(crate) images_directory: PathBuf,
    /// Frame file name pattern.
    pub(crate) pattern: FramePattern,
    /// Output video.
    pub(crate) output: PathBuf,
    /// Time each source frame is held on the timeline.
    pub(crate) hold: Duration,
    /// Output playback frame rate.
    pub(crate) frame_rate: u32,
    /// Codec, quality, and resolution settings.
    pub(crate) encoder: VideoEncoderOptions,
    /// What to do when the generator exits unsuccessfully.
    pub(crate) exit_policy: ExitPolicy,
    /// Whether to launch the generator at all.
    pub(crate) run_generator: bool,
    /// Leave consumed frames on disk after a successful encode.
    pub(crate) keep_frames: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ReelOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ReelOptions")
            .field("install_root", &self.install_root)
            .field("generator", &self.generator)
            .field("working_directory", &self.working_directory)
            .field("images_directory", &self.images_directory)
            .field("pattern", &self.pattern)
            .field("output", &self.output)
            .field("hold", &self.hold)
            .field("frame_rate", &self.frame_rate)
            .field("encoder", &self.encoder)
            .field("exit_policy", &self.exit_policy)
            .field("run_generator", &self.run_generator)
            .field("keep_frames", &self.keep_frames)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ReelOptions {
    fn default() -> Self {
        Self {
            install_root: None,
            generator: PathBuf::from(DEFAULT_GENERATOR),
            working_directory: None,
            images_directory: PathBuf::from(DEFAULT_IMAGES_DIRECTORY),
            pattern: FramePattern::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            hold: DEFAULT_HOLD,
            frame_rate: DEFAULT_FRAME_RATE,
            encoder: VideoEncoderOptions::default(),
            exit_policy: ExitPolicy::default(),
            run_generator: true,
            keep_frames: false,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }
}

impl ReelOptions {
    /// Create options with the stock defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory the generator is resolved against.
    pub fn with_install_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.install_root = Some(root.into());
        self
    }

    /// Set the generator executable, relative to the install root or absolute.
    pub fn with_generator<P: Into<PathBuf>>(mut self, generator: P) -> Self {
        self.generator = generator.into();
        self
    }

    /// Set the working directory.
    pub fn with_working_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    /// Set the frame directory.
    pub fn with_images_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.images_directory = directory.into();
        self
    }

    /// Set the frame file name pattern.
    pub fn with_pattern(mut self, pattern: FramePattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set the output video path.
    pub fn with_output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = output.into();
        self
    }

    /// Set how long each frame is held on the timeline.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Set the output playback frame rate.
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set codec and quality options.
    pub fn with_encoder(mut self, encoder: VideoEncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Set the policy for an unsuccessful generator exit.
    pub fn with_exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    /// Skip launching the generator and assemble whatever frames exist.
    pub fn skip_generator(mut self) -> Self {
        self.run_generator = false;
        self
    }

    /// Keep consumed frames after a successful encode.
    pub fn keep_frames(mut self) -> Self {
        self.keep_frames = true;
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Hold duration per frame.
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Exit policy for the generator.
    pub fn exit_policy(&self) -> ExitPolicy {
        self.exit_policy
    }

    /// Absolute path of the generator executable.
    ///
    /// # Errors
    ///
    /// Returns [`ReelError::Launch`] if no install root is set and the path
    /// of the running binary cannot be determined.
    pub fn generator_path(&self) -> Result<PathBuf, ReelError> {
        match &self.install_root {
            Some(root) => Ok(root.join(&self.generator)),
            None => generator_beside(env::current_exe(), &self.generator),
        }
    }

    /// The working directory, defaulting to the current directory.
    pub fn working_directory(&self) -> Result<PathBuf, ReelError> {
        match &self.working_directory {
            Some(directory) => Ok(directory.clone()),
            None => Ok(env::current_dir()?),
        }
    }

    /// Frame directory resolved against the working directory.
    pub fn images_path(&self) -> Result<PathBuf, ReelError> {
        Ok(resolve(&self.working_directory()?, &self.images_directory))
    }

    /// Output path resolved against the working directory.
    pub fn output_path(&self) -> Result<PathBuf, ReelError> {
        Ok(resolve(&self.working_directory()?, &self.output))
    }
}

fn generator_beside(exe: io::Result<PathBuf>, generator: &Path) -> Result<PathBuf, ReelError> {
    let exe = exe.map_err(|source| ReelError::Launch {
        path: generator.to_path_buf(),
        source,
    })?;
    let root = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(root.join(generator))
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
