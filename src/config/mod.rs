//! Capture configuration.
//!
//! [`ExportSettings`] is the user-facing document; [`CaptureConfig`] is the validated,
//! fully resolved form the session runs on.

/// Quality presets.
pub mod preset;
/// JSON export settings.
pub mod settings;

pub use preset::{PresetParams, QualityPreset};
pub use settings::ExportSettings;

use crate::capture::transcode::ImageCodec;
use crate::encode::encoder::EncoderParams;
use crate::foundation::core::{Fps, PixelSize};
use crate::foundation::error::{CaptureError, CaptureResult};

/// Resolved configuration for one export.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    /// Output frame rate.
    pub fps: Fps,
    /// Number of frames to capture, starting at frame 0.
    pub frame_count: u64,
    /// Native size of the render surface.
    pub source: PixelSize,
    /// Size of exported frames.
    pub export: PixelSize,
    /// JPEG quality `1..=100`.
    pub compression_quality: u8,
    /// Frames extracted concurrently per batch.
    pub batch_size: usize,
    /// Frames staged per write chunk.
    pub write_batch_size: usize,
    /// Prefer raw-pixel transport when the estimate allows it.
    pub use_raw_pixels: bool,
    /// Export resolution relative to the surface.
    pub resolution_scale: f64,
    /// Compressed-image format.
    pub image_codec: ImageCodec,
    /// Encoder parameters.
    pub encoder: EncoderParams,
}

impl CaptureConfig {
    /// Resolve `settings` against a surface of size `source`.
    pub fn derive(settings: &ExportSettings, source: PixelSize) -> CaptureResult<Self> {
        let params = settings.preset.params();
        let resolution_scale = settings.resolution_scale.unwrap_or(params.resolution_scale);
        if !(resolution_scale > 0.0 && resolution_scale <= 1.0) {
            return Err(CaptureError::validation(format!(
                "resolution_scale must be in (0, 1], got {resolution_scale}"
            )));
        }
        let export = source.scaled_even(resolution_scale);

        let cfg = Self {
            fps: settings.fps()?,
            frame_count: settings.frame_count()?,
            source,
            export,
            compression_quality: settings
                .compression_quality
                .unwrap_or(params.compression_quality),
            batch_size: settings.batch_size.unwrap_or(params.batch_size),
            write_batch_size: settings.write_batch_size.unwrap_or(params.write_batch_size),
            use_raw_pixels: settings.use_raw_pixels.unwrap_or(params.use_raw_pixels),
            resolution_scale,
            image_codec: params.image_codec,
            encoder: params.encoder,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.frame_count == 0 {
            return Err(CaptureError::validation("frame_count must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(CaptureError::validation("batch_size must be > 0"));
        }
        if self.write_batch_size == 0 {
            return Err(CaptureError::validation("write_batch_size must be > 0"));
        }
        if !(1..=100).contains(&self.compression_quality) {
            return Err(CaptureError::validation(
                "compression_quality must be in 1..=100",
            ));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(CaptureError::validation("source size must be non-zero"));
        }
        if self.export.width == 0 || self.export.height == 0 {
            return Err(CaptureError::validation("export size must be non-zero"));
        }
        if self.export.width > self.source.width || self.export.height > self.source.height {
            return Err(CaptureError::validation(format!(
                "export size {} exceeds source size {}",
                self.export, self.source
            )));
        }
        Ok(())
    }

    /// Byte length of one exported RGBA frame.
    pub fn frame_bytes(&self) -> u64 {
        self.export.pixel_count() * 4
    }

    /// `true` when frames must be resampled after read-back.
    pub fn needs_resample(&self) -> bool {
        self.export != self.source
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/mod.rs"]
mod tests;
