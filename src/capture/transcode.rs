use crate::foundation::core::PixelSize;
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::pool::BufferPool;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};

/// Per-frame compressed image format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCodec {
    /// Lossy JPEG; alpha is discarded.
    #[default]
    Jpeg,
    /// Lossless PNG with alpha.
    Png,
}

impl ImageCodec {
    /// File extension used for staged frames.
    pub fn extension(self) -> &'static str {
        match self {
            ImageCodec::Jpeg => "jpg",
            ImageCodec::Png => "png",
        }
    }
}

/// Converts RGBA8 frames into compressed image blobs and resamples frames to export size.
///
/// Scanlines are kept in capture order; no vertical flip is applied, so surfaces must deliver
/// rows top to bottom.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelTranscoder {
    codec: ImageCodec,
}

impl PixelTranscoder {
    /// Create a transcoder emitting `codec` images.
    pub fn new(codec: ImageCodec) -> Self {
        Self { codec }
    }

    /// Output format.
    pub fn codec(&self) -> ImageCodec {
        self.codec
    }

    /// Encode `rgba` (`width*height*4` bytes) as a compressed image.
    ///
    /// `quality` is `1..=100` and only affects JPEG. A buffer whose length does not match the
    /// declared dimensions is rejected.
    pub fn to_compressed_image(
        &self,
        rgba: &[u8],
        size: PixelSize,
        quality: u8,
        pool: &mut BufferPool,
    ) -> CaptureResult<Vec<u8>> {
        if let Err(e) = CaptureError::check_rgba_len(rgba, size.width, size.height) {
            tracing::warn!(%size, len = rgba.len(), "refusing to transcode mis-sized frame");
            return Err(e);
        }

        let mut surface = pool.acquire_surface(size);
        surface.copy_from_slice(rgba);

        let mut out = Vec::with_capacity(rgba.len() / 8);
        let res = match self.codec {
            ImageCodec::Jpeg => {
                let mut rgb = pool.acquire_buffer(size.pixel_count() as usize * 3);
                for (d, s) in rgb.chunks_exact_mut(3).zip(surface.as_raw().chunks_exact(4)) {
                    d.copy_from_slice(&s[..3]);
                }
                let res = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut out,
                    quality.clamp(1, 100),
                )
                .write_image(&rgb, size.width, size.height, ExtendedColorType::Rgb8);
                pool.release_buffer(rgb);
                res
            }
            ImageCodec::Png => image::codecs::png::PngEncoder::new(&mut out).write_image(
                surface.as_raw(),
                size.width,
                size.height,
                ExtendedColorType::Rgba8,
            ),
        };
        pool.release_surface(surface);

        res.map_err(|e| {
            CaptureError::Other(anyhow::anyhow!(
                "{} encode of {size} frame failed: {e}",
                self.codec.extension()
            ))
        })?;
        Ok(out)
    }

    /// Resample `rgba` from `src` to `dst` with a high-quality (Catmull-Rom) filter.
    ///
    /// Always returns a new buffer of exactly `dst.rgba_len()` bytes.
    pub fn downsample(&self, rgba: &[u8], src: PixelSize, dst: PixelSize) -> CaptureResult<Vec<u8>> {
        CaptureError::check_rgba_len(rgba, src.width, src.height)?;
        if dst.width == 0 || dst.height == 0 {
            return Err(CaptureError::validation(
                "downsample target width/height must be non-zero",
            ));
        }
        let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(src.width, src.height, rgba)
            .ok_or_else(|| CaptureError::validation("downsample source buffer too small"))?;
        let resized = image::imageops::resize(
            &view,
            dst.width,
            dst.height,
            image::imageops::FilterType::CatmullRom,
        );
        Ok(resized.into_raw())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/transcode.rs"]
mod tests;
