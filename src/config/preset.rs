use crate::capture::transcode::ImageCodec;
use crate::encode::encoder::EncoderParams;

/// Export quality preset. Every capture configuration is derived from one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Half resolution, compressed transport, fast encode.
    Draft,
    /// Three-quarter resolution, raw transport preferred.
    #[default]
    Standard,
    /// Full resolution, raw transport preferred, slower encode.
    High,
    /// Full resolution, PNG frames when compressed transport is used, lossless encode.
    Lossless,
}

/// Values a [`QualityPreset`] expands to.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetParams {
    /// Frames extracted concurrently per batch.
    pub batch_size: usize,
    /// Frames staged per write chunk.
    pub write_batch_size: usize,
    /// JPEG quality `1..=100`.
    pub compression_quality: u8,
    /// Prefer raw-pixel transport.
    pub use_raw_pixels: bool,
    /// Export resolution relative to the surface.
    pub resolution_scale: f64,
    /// Compressed-image format.
    pub image_codec: ImageCodec,
    /// Encoder parameters passed through unchanged.
    pub encoder: EncoderParams,
}

impl QualityPreset {
    /// All presets, lowest quality first.
    pub const ALL: [QualityPreset; 4] = [
        QualityPreset::Draft,
        QualityPreset::Standard,
        QualityPreset::High,
        QualityPreset::Lossless,
    ];

    /// Expand the preset.
    pub fn params(self) -> PresetParams {
        match self {
            QualityPreset::Draft => PresetParams {
                batch_size: 30,
                write_batch_size: 60,
                compression_quality: 70,
                use_raw_pixels: false,
                resolution_scale: 0.5,
                image_codec: ImageCodec::Jpeg,
                encoder: EncoderParams::new("ultrafast", 28),
            },
            QualityPreset::Standard => PresetParams {
                batch_size: 20,
                write_batch_size: 30,
                compression_quality: 85,
                use_raw_pixels: true,
                resolution_scale: 0.75,
                image_codec: ImageCodec::Jpeg,
                encoder: EncoderParams::new("veryfast", 23),
            },
            QualityPreset::High => PresetParams {
                batch_size: 10,
                write_batch_size: 20,
                compression_quality: 92,
                use_raw_pixels: true,
                resolution_scale: 1.0,
                image_codec: ImageCodec::Jpeg,
                encoder: EncoderParams::new("medium", 18),
            },
            QualityPreset::Lossless => PresetParams {
                batch_size: 10,
                write_batch_size: 10,
                compression_quality: 100,
                use_raw_pixels: true,
                resolution_scale: 1.0,
                image_codec: ImageCodec::Png,
                encoder: EncoderParams::new("slow", 0),
            },
        }
    }

    /// Lowercase name as used in settings files.
    pub fn name(self) -> &'static str {
        match self {
            QualityPreset::Draft => "draft",
            QualityPreset::Standard => "standard",
            QualityPreset::High => "high",
            QualityPreset::Lossless => "lossless",
        }
    }
}
