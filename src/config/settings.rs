use crate::config::preset::QualityPreset;
use crate::foundation::core::Fps;
use crate::foundation::error::{CaptureError, CaptureResult};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// User-facing export settings, typically loaded from a JSON file.
///
/// Unset overrides fall back to the preset's values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// Quality preset.
    pub preset: QualityPreset,
    /// Integer output frame rate.
    pub fps: u32,
    /// Clip duration in seconds, used when `frame_count` is unset.
    pub duration_secs: f64,
    /// Exact number of frames to capture.
    pub frame_count: Option<u64>,
    /// Export resolution relative to the surface, `(0, 1]`.
    pub resolution_scale: Option<f64>,
    /// Override of the preset's capture batch size.
    pub batch_size: Option<usize>,
    /// Override of the preset's write batch size.
    pub write_batch_size: Option<usize>,
    /// Override of the preset's JPEG quality.
    pub compression_quality: Option<u8>,
    /// Override of the preset's raw-transport preference.
    pub use_raw_pixels: Option<bool>,
    /// Companion audio file muxed into the output.
    pub audio_path: Option<PathBuf>,
    /// Loop the audio for the full video length.
    pub audio_loop: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            preset: QualityPreset::default(),
            fps: 30,
            duration_secs: 5.0,
            frame_count: None,
            resolution_scale: None,
            batch_size: None,
            write_batch_size: None,
            compression_quality: None,
            use_raw_pixels: None,
            audio_path: None,
            audio_loop: false,
        }
    }
}

impl ExportSettings {
    /// Parse settings from JSON text.
    pub fn from_json_str(s: &str) -> CaptureResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| CaptureError::validation(format!("invalid export settings: {e}")))
    }

    /// Load settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read export settings '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Validated frame rate.
    pub fn fps(&self) -> CaptureResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Number of frames to capture.
    pub fn frame_count(&self) -> CaptureResult<u64> {
        if let Some(n) = self.frame_count {
            return Ok(n);
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(CaptureError::validation(
                "duration_secs must be a positive number",
            ));
        }
        Ok(self.fps()?.secs_to_frames_floor(self.duration_secs))
    }
}
