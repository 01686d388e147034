//! Video encoder: turn a frame sequence into a video file.
//!
//! [`VideoEncoder`] walks a [`Timeline`], decodes each source frame once in
//! index order, and feeds FFmpeg one RGB frame per output frame. The
//! container is inferred from the output extension.
//!
//! # Example
//!
//! ```no_run
//! use std::{path::Path, time::Duration};
//!
//! use huegene_reel::{FramePattern, FrameSequence, ReelError, Timeline, VideoEncoder, VideoEncoderOptions};
//!
//! let frames = FrameSequence::discover(Path::new("Images"), &FramePattern::default())?;
//! let timeline = Timeline::new(frames.len(), Duration::from_millis(30), 24)?;
//! VideoEncoder::new(VideoEncoderOptions::default())
//!     .write("test.mp4", &frames, &timeline)?;
//! # Ok::<(), ReelError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::encoder::video::Encoder as OpenedEncoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Dictionary, Packet, Rational};
use image::RgbImage;
use image::imageops::FilterType;

use crate::{
    error::ReelError,
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    sequence::FrameSequence,
    timeline::Timeline,
};

/// Codec, quality, and resolution settings for the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoderOptions {
    /// Output width. If `None`, taken from the first frame.
    pub width: Option<u32>,
    /// Output height. If `None`, taken from the first frame.
    pub height: Option<u32>,
    /// Codec to use. Default is H.264.
    pub codec: VideoCodec,
    /// Constant Rate Factor (0-51, lower is better). Applies to H.264 and
    /// H.265. Default: 23.
    pub crf: Option<u32>,
    /// Bitrate in bits per second.
    pub bitrate: Option<usize>,
}

impl Default for VideoEncoderOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            codec: VideoCodec::H264,
            crf: Some(23),
            bitrate: None,
        }
    }
}

impl VideoEncoderOptions {
    /// Set the output resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the codec.
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the CRF quality value.
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the target bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Output size for a first frame of `width` × `height`.
    ///
    /// YUV 4:2:0 needs even dimensions, so odd values are rounded down.
    pub fn resolve_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        (
            even(self.width.unwrap_or(width)),
            even(self.height.unwrap_or(height)),
        )
    }
}

fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2.
    Mpeg4,
}

impl VideoCodec {
    /// Parse a codec name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "h264" | "avc" | "x264" => Some(VideoCodec::H264),
            "h265" | "hevc" | "x265" => Some(VideoCodec::H265),
            "mpeg4" => Some(VideoCodec::Mpeg4),
            _ => None,
        }
    }

    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }

    fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

/// Encodes a frame sequence along a timeline.
pub struct VideoEncoder {
    options: VideoEncoderOptions,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl VideoEncoder {
    /// Create an encoder with the given options.
    pub fn new(options: VideoEncoderOptions) -> Self {
        Self {
            options,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Report [`OperationType::Encoding`] progress once per output frame.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Check `token` before every output frame.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Encode `frames` along `timeline` into `path`.
    ///
    /// Every frame header is probed before the output file is created, so
    /// an obviously broken frame never leaves a stub video behind. Every
    /// frame is then fully decoded exactly once in index order, including
    /// frames the timeline never shows. If encoding fails after the output
    /// was opened the partial file is removed.
    ///
    /// Returns the number of encoded frames.
    ///
    /// # Errors
    ///
    /// - [`ReelError::EmptyInput`] if `frames` is empty.
    /// - [`ReelError::Decode`] if a frame cannot be read as an image.
    /// - [`ReelError::Encode`] if FFmpeg cannot encode or write the output.
    /// - [`ReelError::Cancelled`] if the cancellation token fired.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        frames: &FrameSequence,
        timeline: &Timeline,
    ) -> Result<u64, ReelError> {
        let path = path.as_ref();
        log::info!(
            "Writing {} source frame(s) to {:?} (codec={:?}, fps={}, hold={:?})",
            frames.len(),
            path,
            self.options.codec,
            timeline.frame_rate(),
            timeline.hold(),
        );

        if frames.is_empty() {
            return Err(ReelError::EmptyInput {
                directory: frames.directory().to_path_buf(),
                reason: "no frames to encode".to_string(),
            });
        }

        let (first_width, first_height) = probe_frames(frames.paths())?;
        let (width, height) = self.options.resolve_dimensions(first_width, first_height);

        ffmpeg_next::init()?;

        let mut output_opened = false;
        let result = self.encode(path, frames, timeline, width, height, &mut output_opened);
        if result.is_err() && output_opened {
            if let Err(error) = fs::remove_file(path) {
                log::debug!("Could not remove partial output {}: {error}", path.display());
            }
        }
        result
    }

    fn encode(
        &self,
        path: &Path,
        frames: &FrameSequence,
        timeline: &Timeline,
        width: u32,
        height: u32,
        output_opened: &mut bool,
    ) -> Result<u64, ReelError> {
        let frame_rate = i32::try_from(timeline.frame_rate()).map_err(|_| ReelError::InvalidFrameRate)?;
        let encoder_time_base = Rational::new(1, frame_rate);
        let codec_id = self.options.codec.to_codec_id();
        let target_pixel = Pixel::YUV420P;

        let mut output = ffmpeg_next::format::output(path)
            .map_err(|e| ReelError::Encode(format!("cannot open output {}: {e}", path.display())))?;
        *output_opened = true;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let encoder_codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| ReelError::Encode(format!("codec {codec_id:?} not available")))?;

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|e| ReelError::Encode(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .map_err(|e| ReelError::Encode(format!("cannot create codec context: {e}")))?
            .encoder()
            .video()
            .map_err(|e| ReelError::Encode(format!("cannot open video encoder: {e}")))?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(target_pixel);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(Rational::new(frame_rate, 1)));

        if let Some(bitrate) = self.options.bitrate {
            encoder.set_bit_rate(bitrate);
        }

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let mut codec_options = Dictionary::new();
        if let Some(crf) = self.options.crf.filter(|_| self.options.codec.supports_crf()) {
            codec_options.set("crf", &crf.to_string());
        }

        let mut opened_encoder = encoder
            .open_as_with(encoder_codec, codec_options)
            .map_err(|e| ReelError::Encode(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&opened_encoder);

        output
            .write_header()
            .map_err(|e| ReelError::Encode(format!("cannot write header: {e}")))?;

        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| ReelError::Encode("output stream vanished".to_string()))?;
        let sink = PacketSink {
            stream_index,
            encoder_time_base,
            stream_time_base,
        };

        let mut scaler = ScalingContext::get(
            Pixel::RGB24,
            width,
            height,
            target_pixel,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| ReelError::Encode(format!("cannot create scaler: {e}")))?;

        let total = timeline.output_frame_count();
        let mut tracker = ProgressTracker::new(self.progress.clone(), OperationType::Encoding, Some(total));
        let mut source_frame = VideoFrame::new(Pixel::RGB24, width, height);
        let mut current_source: Option<usize> = None;
        // First source index not decoded yet.
        let mut next_source = 0_usize;

        for (output_index, source_index) in timeline.plan().enumerate() {
            if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(ReelError::Cancelled);
            }

            if current_source != Some(source_index) {
                for skipped in next_source..source_index {
                    verify_frame(frame_path(frames, skipped)?)?;
                }
                let rgb = load_frame(frame_path(frames, source_index)?, width, height)?;
                fill_rgb_frame(&rgb, &mut source_frame);
                current_source = Some(source_index);
                next_source = source_index + 1;
            }

            let mut scaled = VideoFrame::empty();
            scaler
                .run(&source_frame, &mut scaled)
                .map_err(|e| ReelError::Encode(format!("scaling failed: {e}")))?;
            scaled.set_pts(Some(output_index as i64));

            opened_encoder
                .send_frame(&scaled)
                .map_err(|e| ReelError::Encode(format!("send_frame failed: {e}")))?;
            sink.drain(&mut opened_encoder, &mut output)?;

            tracker.advance();
        }

        for trailing in next_source..frames.len() {
            verify_frame(frame_path(frames, trailing)?)?;
        }

        opened_encoder
            .send_eof()
            .map_err(|e| ReelError::Encode(format!("send_eof failed: {e}")))?;
        sink.drain(&mut opened_encoder, &mut output)?;

        output
            .write_trailer()
            .map_err(|e| ReelError::Encode(format!("cannot write trailer: {e}")))?;

        log::debug!("Encoded {total} frame(s) into {}", path.display());
        Ok(total)
    }
}

/// Moves encoded packets from the encoder into the muxer.
struct PacketSink {
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
}

impl PacketSink {
    fn drain(&self, encoder: &mut OpenedEncoder, output: &mut Output) -> Result<(), ReelError> {
        let mut packet = Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(output)
                .map_err(|e| ReelError::Encode(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}

/// Read every frame header and return the first frame's dimensions.
fn probe_frames(paths: &[PathBuf]) -> Result<(u32, u32), ReelError> {
    let mut first = None;
    for path in paths {
        let dimensions = image::image_dimensions(path).map_err(|source| ReelError::Decode {
            path: path.clone(),
            source,
        })?;
        first.get_or_insert(dimensions);
    }
    Ok(first.unwrap_or((0, 0)))
}

fn frame_path(frames: &FrameSequence, index: usize) -> Result<&Path, ReelError> {
    frames
        .paths()
        .get(index)
        .map(PathBuf::as_path)
        .ok_or_else(|| ReelError::MissingFrame {
            index,
            path: frames.directory().to_path_buf(),
        })
}

/// Fully decode a frame that no output frame shows.
fn verify_frame(path: &Path) -> Result<(), ReelError> {
    image::open(path).map(drop).map_err(|source| ReelError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode `path` as RGB8, resized to `width` × `height` when needed.
fn load_frame(path: &Path, width: u32, height: u32) -> Result<RgbImage, ReelError> {
    let image = image::open(path).map_err(|source| ReelError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    if image.width() != width || image.height() != height {
        Ok(image.resize_exact(width, height, FilterType::Lanczos3).to_rgb8())
    } else {
        Ok(image.to_rgb8())
    }
}

/// Copy tightly packed RGB rows into a frame whose rows may be padded.
fn fill_rgb_frame(rgb: &RgbImage, frame: &mut VideoFrame) {
    let row_len = rgb.width() as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for (row, pixels) in rgb.as_raw().chunks_exact(row_len).enumerate() {
        let start = row * stride;
        data[start..start + row_len].copy_from_slice(pixels);
    }
}
