use crate::capture::transcode::PixelTranscoder;
use crate::config::CaptureConfig;
use crate::foundation::core::{Fps, FrameIndex, PixelSize};
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::pool::BufferPool;
use crate::render::surface::{PixelRect, RenderSurface};

/// Reads one RGBA8 frame per call from a [`RenderSurface`], at export resolution.
#[derive(Clone, Copy, Debug)]
pub struct FrameExtractor {
    fps: Fps,
    source: PixelSize,
    export: PixelSize,
    transcoder: PixelTranscoder,
}

impl FrameExtractor {
    /// Build an extractor for a capture configuration.
    pub fn new(cfg: &CaptureConfig) -> Self {
        Self {
            fps: cfg.fps,
            source: cfg.source,
            export: cfg.export,
            transcoder: PixelTranscoder::new(cfg.image_codec),
        }
    }

    /// Export resolution of returned buffers.
    pub fn export_size(&self) -> PixelSize {
        self.export
    }

    /// Render `frame` and read it back.
    ///
    /// Prefers the surface's direct pixel read into a pooled buffer and falls back to
    /// `extract_frame`. When the export size differs from the source size the frame is resampled
    /// and the full-resolution buffer goes back to the pool. Fails with `FrameExtraction` when no
    /// path yields a full frame; callers must not retry.
    pub fn extract(
        &self,
        surface: &mut dyn RenderSurface,
        pool: &mut BufferPool,
        frame: FrameIndex,
    ) -> CaptureResult<Vec<u8>> {
        surface.render(frame, self.fps).map_err(|e| {
            CaptureError::frame_extraction(frame.0, format!("render pass failed: {e}"))
        })?;

        let full = self.read_native(surface, pool, frame)?;
        if self.export == self.source {
            return Ok(full);
        }

        let scaled = self.transcoder.downsample(&full, self.source, self.export);
        pool.release_buffer(full);
        scaled.map_err(|e| CaptureError::frame_extraction(frame.0, format!("resample failed: {e}")))
    }

    fn read_native(
        &self,
        surface: &mut dyn RenderSurface,
        pool: &mut BufferPool,
        frame: FrameIndex,
    ) -> CaptureResult<Vec<u8>> {
        let len = self.source.rgba_len();

        let low_level = match surface.pixel_reader() {
            Some(reader) => {
                let mut buf = pool.acquire_buffer(len);
                match reader.read_pixels(PixelRect::full(self.source), &mut buf) {
                    Ok(()) => return Ok(buf),
                    Err(e) => {
                        pool.release_buffer(buf);
                        tracing::debug!(frame = frame.0, error = %e, "direct pixel read failed, falling back");
                        format!("direct read failed: {e}")
                    }
                }
            }
            None => "no direct read path".to_string(),
        };

        match surface.extract_frame() {
            Ok(data) if data.len() == len => Ok(data),
            Ok(data) if data.is_empty() => Err(CaptureError::frame_extraction(
                frame.0,
                format!("{low_level}; extract_frame returned no data"),
            )),
            Ok(data) => Err(CaptureError::frame_extraction(
                frame.0,
                format!(
                    "{low_level}; extract_frame returned {} bytes, expected {len}",
                    data.len()
                ),
            )),
            Err(e) => Err(CaptureError::frame_extraction(
                frame.0,
                format!("{low_level}; extract_frame failed: {e}"),
            )),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/extractor.rs"]
mod tests;
