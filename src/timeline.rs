//! Hold-duration timeline.
//!
//! Every source frame occupies `hold` seconds of a continuous timeline.
//! The output video samples that timeline at `frame_rate` frames per
//! second, so the visible pacing depends on both values: at 30 ms per
//! frame and 24 fps some source frames are never shown on their own.
//!
//! All arithmetic is done in integer nanoseconds.

use std::time::Duration;

use crate::error::ReelError;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Mapping from output frames to source frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    source_count: usize,
    hold: Duration,
    frame_rate: u32,
}

impl Timeline {
    /// Build a timeline of `source_count` frames, each held for `hold`,
    /// sampled at `frame_rate`.
    ///
    /// # Errors
    ///
    /// - [`ReelError::InvalidHoldDuration`] if `hold` is zero.
    /// - [`ReelError::InvalidFrameRate`] if `frame_rate` is zero.
    pub fn new(source_count: usize, hold: Duration, frame_rate: u32) -> Result<Self, ReelError> {
        if hold.is_zero() {
            return Err(ReelError::InvalidHoldDuration);
        }
        if frame_rate == 0 {
            return Err(ReelError::InvalidFrameRate);
        }
        Ok(Self {
            source_count,
            hold,
            frame_rate,
        })
    }

    /// Number of source frames on the timeline.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// Hold duration of each source frame.
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Total timeline length.
    pub fn duration(&self) -> Duration {
        let nanos = self.hold.as_nanos() * self.source_count as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Number of frames in the encoded video.
    ///
    /// `round(source_count × hold × frame_rate)`, but at least one frame
    /// whenever there is a source frame. The count rounds to nearest where
    /// moviepy truncates (`int(duration * fps)`): 4 frames at 30 ms and
    /// 24 fps give 3 frames here and 2 there.
    pub fn output_frame_count(&self) -> u64 {
        if self.source_count == 0 {
            return 0;
        }
        let scaled = self.source_count as u128 * self.hold.as_nanos() * self.frame_rate as u128;
        let rounded = (scaled + NANOS_PER_SECOND / 2) / NANOS_PER_SECOND;
        u64::try_from(rounded).unwrap_or(u64::MAX).max(1)
    }

    /// Source frame visible at output frame `output_index`.
    ///
    /// Indices past the end of the timeline clamp to the last source frame.
    /// Returns `None` for an empty timeline.
    pub fn source_index(&self, output_index: u64) -> Option<usize> {
        if self.source_count == 0 {
            return None;
        }
        let numerator = output_index as u128 * NANOS_PER_SECOND;
        let denominator = self.frame_rate as u128 * self.hold.as_nanos();
        let index = usize::try_from(numerator / denominator).unwrap_or(usize::MAX);
        Some(index.min(self.source_count - 1))
    }

    /// Source index for every output frame, in output order.
    pub fn plan(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.output_frame_count()).filter_map(|output| self.source_index(output))
    }
}
