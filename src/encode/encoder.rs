use crate::capture::transcode::ImageCodec;
use crate::foundation::core::{Fps, PixelSize};
use crate::foundation::error::{CaptureError, CaptureResult};
use anyhow::Context as _;
use std::path::PathBuf;

/// Codec parameters handed to the encoder unchanged.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncoderParams {
    /// x264 speed preset.
    pub preset: String,
    /// Constant rate factor; `0` is lossless.
    pub crf: u8,
    /// Output pixel format.
    pub pixel_format: String,
    /// Audio bitrate, used only when an audio track is attached.
    pub audio_bitrate: String,
}

impl EncoderParams {
    /// `yuv420p` output with 192k audio.
    pub fn new(preset: impl Into<String>, crf: u8) -> Self {
        Self {
            preset: preset.into(),
            crf,
            pixel_format: "yuv420p".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self::new("veryfast", 23)
    }
}

/// Staged video input.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeInput {
    /// Compressed images named by 1-based sequence number.
    ImageSequence {
        /// Directory holding the images.
        dir: PathBuf,
        /// printf-style file pattern, e.g. `frame_%05d.jpg`.
        pattern: String,
        /// Sequence number of the first image.
        start_number: u64,
        /// Number of images.
        frame_count: u64,
        /// Image format.
        codec: ImageCodec,
    },
    /// One contiguous blob of tightly packed frames.
    RawPixels {
        /// Blob file.
        path: PathBuf,
        /// Frame size.
        size: PixelSize,
        /// Pixel layout name, always `rgba`.
        pixel_format: String,
        /// Number of frames in the blob.
        frame_count: u64,
    },
}

impl EncodeInput {
    /// Number of frames the input carries.
    pub fn frame_count(&self) -> u64 {
        match self {
            EncodeInput::ImageSequence { frame_count, .. }
            | EncodeInput::RawPixels { frame_count, .. } => *frame_count,
        }
    }

    /// `true` for raw-pixel input.
    pub fn is_raw(&self) -> bool {
        matches!(self, EncodeInput::RawPixels { .. })
    }

    /// Path of the image with sequence number `seq`. `None` for raw input.
    pub fn image_path(&self, seq: u64) -> Option<PathBuf> {
        match self {
            EncodeInput::ImageSequence { dir, codec, .. } => {
                Some(dir.join(format!("frame_{seq:05}.{}", codec.extension())))
            }
            EncodeInput::RawPixels { .. } => None,
        }
    }
}

/// Companion audio file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
    /// Staged audio file.
    pub path: PathBuf,
    /// Loop the track for the full video length.
    pub looped: bool,
}

/// Everything an encoder needs for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeJob {
    /// Declared frame rate.
    pub fps: Fps,
    /// Video input.
    pub input: EncodeInput,
    /// Optional audio.
    pub audio: Option<AudioTrack>,
    /// Codec parameters.
    pub params: EncoderParams,
    /// Where the container should be written.
    pub output_path: PathBuf,
}

/// Encoder/muxer boundary. Returns the encoded container bytes.
pub trait VideoEncoder {
    /// Encode one job. Not retried on failure.
    fn encode(&mut self, job: &EncodeJob) -> CaptureResult<Vec<u8>>;
}

/// Input as observed by [`InMemoryEncoder`] at encode time.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedInput {
    /// Contents of the raw blob.
    Raw(Vec<u8>),
    /// Contents of every image, in sequence order.
    Images(Vec<Vec<u8>>),
}

/// One recorded invocation.
#[derive(Clone, Debug)]
pub struct RecordedJob {
    /// The job as passed in.
    pub job: EncodeJob,
    /// Staged input read back from disk.
    pub input: RecordedInput,
    /// Staged audio read back from disk.
    pub audio: Option<Vec<u8>>,
}

/// Encoder for tests and debugging.
///
/// Reads back the staged input so callers can inspect exactly what an external encoder would
/// have seen, and returns a deterministic byte stream.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    fail_with: Option<String>,
    jobs: Vec<RecordedJob>,
}

impl InMemoryEncoder {
    /// Create an encoder that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder that fails every job with `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            fail_with: Some(msg.into()),
            jobs: Vec::new(),
        }
    }

    /// Invocations so far.
    pub fn jobs(&self) -> &[RecordedJob] {
        &self.jobs
    }

    /// Bytes returned for `job`.
    pub fn output_for(job: &EncodeJob) -> Vec<u8> {
        let kind = if job.input.is_raw() { "raw" } else { "images" };
        format!(
            "framestage:{kind}:{}@{}:audio={}",
            job.input.frame_count(),
            job.fps.to_ffmpeg_rate(),
            job.audio.is_some()
        )
        .into_bytes()
    }
}

impl VideoEncoder for InMemoryEncoder {
    fn encode(&mut self, job: &EncodeJob) -> CaptureResult<Vec<u8>> {
        let input = match &job.input {
            EncodeInput::RawPixels { path, .. } => RecordedInput::Raw(
                std::fs::read(path)
                    .with_context(|| format!("failed to read raw blob '{}'", path.display()))?,
            ),
            EncodeInput::ImageSequence {
                start_number,
                frame_count,
                ..
            } => {
                let mut images = Vec::with_capacity(*frame_count as usize);
                for seq in *start_number..start_number + frame_count {
                    let path = job.input.image_path(seq).ok_or_else(|| {
                        CaptureError::encoding("image sequence without image paths")
                    })?;
                    images.push(
                        std::fs::read(&path)
                            .with_context(|| format!("missing frame '{}'", path.display()))?,
                    );
                }
                RecordedInput::Images(images)
            }
        };
        let audio = match &job.audio {
            Some(track) => Some(
                std::fs::read(&track.path)
                    .with_context(|| format!("missing audio '{}'", track.path.display()))?,
            ),
            None => None,
        };

        self.jobs.push(RecordedJob {
            job: job.clone(),
            input,
            audio,
        });

        if let Some(msg) = self.fail_with.as_ref() {
            return Err(CaptureError::encoding(msg.clone()));
        }
        Ok(Self::output_for(job))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
