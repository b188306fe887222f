//! framestage captures a live-rendered animation frame by frame and hands the ordered frames to
//! a video encoder.
//!
//! The public API is session-oriented:
//!
//! - Derive a [`CaptureConfig`] from [`ExportSettings`] and the surface size
//! - Create a [`CaptureSession`] over a [`RenderSurface`]
//! - [`CaptureSession::export`] into a [`VideoEncoder`] such as [`FfmpegEncoder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Frame capture and the export session.
pub mod capture;
/// Presets, settings and the resolved capture configuration.
pub mod config;
/// Encoder boundary and staging.
pub mod encode;
/// Render surfaces and pooled scratch memory.
pub mod render;

pub use crate::foundation::core::{Fps, FrameIndex, FrameRange, PixelSize};
pub use crate::foundation::error::{CaptureError, CaptureResult};

pub use crate::capture::cancel::CancelToken;
pub use crate::capture::extractor::FrameExtractor;
pub use crate::capture::progress::{
    CapturePhase, ProgressPlan, ProgressTracker, StatusEvent, StatusLog, StatusSink,
};
pub use crate::capture::scheduler::{BatchScheduler, FrameRecord, FrameSpill, SchedulerOpts};
pub use crate::capture::session::{AudioInput, CaptureSession, ExportOutput, SessionOpts};
pub use crate::capture::transcode::{ImageCodec, PixelTranscoder};
pub use crate::capture::transport::{
    RAW_TRANSPORT_LIMIT_BYTES, TransportOpts, TransportStrategy, choose_strategy,
    estimate_raw_bytes,
};
pub use crate::config::{CaptureConfig, ExportSettings, PresetParams, QualityPreset};
pub use crate::encode::encoder::{
    AudioTrack, EncodeInput, EncodeJob, EncoderParams, InMemoryEncoder, RecordedInput,
    RecordedJob, VideoEncoder,
};
pub use crate::encode::ffmpeg::{FfmpegEncoder, is_ffmpeg_on_path};
pub use crate::encode::staging::StagingArea;
pub use crate::render::pool::{BufferPool, PoolOpts, PoolStats};
pub use crate::render::procedural::{ProceduralSurface, ProceduralSurfaceOpts};
pub use crate::render::surface::{PixelReader, PixelRect, RenderState, RenderSurface};
