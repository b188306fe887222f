use crate::capture::progress::ProgressTracker;
use crate::capture::scheduler::{FrameRecord, FrameSpill};
use crate::capture::transcode::PixelTranscoder;
use crate::config::CaptureConfig;
use crate::encode::encoder::EncodeInput;
use crate::encode::staging::StagingArea;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::pool::{BufferPool, PoolOpts};
use rayon::prelude::*;
use std::borrow::Cow;

/// Raw transport is refused above this estimate (1.5 GiB).
pub const RAW_TRANSPORT_LIMIT_BYTES: u64 = 1_610_612_736;

/// How frames travel to the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TransportStrategy {
    /// One contiguous blob of RGBA8 frames.
    RawPixel,
    /// One compressed image file per frame.
    CompressedImage,
}

/// Bytes needed to hold every exported frame contiguously.
pub fn estimate_raw_bytes(cfg: &CaptureConfig) -> u64 {
    cfg.frame_bytes().saturating_mul(cfg.frame_count)
}

/// Pick the transport for a session: raw only when preferred and the estimate fits `threshold`.
pub fn choose_strategy(cfg: &CaptureConfig, threshold: u64) -> TransportStrategy {
    if cfg.use_raw_pixels && estimate_raw_bytes(cfg) <= threshold {
        TransportStrategy::RawPixel
    } else {
        TransportStrategy::CompressedImage
    }
}

/// Write-stage knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportOpts {
    /// Raw transport is refused above this estimate.
    pub raw_threshold_bytes: u64,
    /// Treat contiguous allocations above this size as failed. `None` leaves it to the allocator.
    pub max_contiguous_alloc: Option<u64>,
    /// Transcode the frames of a write batch in parallel.
    pub parallel_transcode: bool,
}

impl Default for TransportOpts {
    fn default() -> Self {
        Self {
            raw_threshold_bytes: RAW_TRANSPORT_LIMIT_BYTES,
            max_contiguous_alloc: None,
            parallel_transcode: true,
        }
    }
}

/// Result of the write stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedFrames {
    /// Transport actually used.
    pub strategy: TransportStrategy,
    /// Encoder input describing the staged files.
    pub input: EncodeInput,
    /// Raw transport was attempted and abandoned.
    pub fell_back: bool,
}

/// Stages captured frames for the encoder.
pub struct FrameTransport<'c> {
    cfg: &'c CaptureConfig,
    opts: TransportOpts,
    transcoder: PixelTranscoder,
}

impl<'c> FrameTransport<'c> {
    /// Create a transport for `cfg`.
    pub fn new(cfg: &'c CaptureConfig, opts: TransportOpts) -> Self {
        Self {
            cfg,
            opts,
            transcoder: PixelTranscoder::new(cfg.image_codec),
        }
    }

    /// Strategy this transport starts with.
    pub fn strategy(&self) -> TransportStrategy {
        choose_strategy(self.cfg, self.opts.raw_threshold_bytes)
    }

    /// Stage every record into `staging` and release the payloads.
    ///
    /// `records` must be the complete, index-sorted capture. An allocation failure during raw
    /// concatenation switches the whole session to compressed images.
    #[tracing::instrument(skip_all, fields(frames = records.len()))]
    pub fn stage(
        &self,
        records: &mut [FrameRecord],
        staging: &StagingArea,
        pool: &mut BufferPool,
        progress: &mut ProgressTracker<'_>,
    ) -> CaptureResult<StagedFrames> {
        if records.len() as u64 != self.cfg.frame_count {
            return Err(CaptureError::validation(format!(
                "expected {} captured frames, got {}",
                self.cfg.frame_count,
                records.len()
            )));
        }

        let mut fell_back = false;
        if self.strategy() == TransportStrategy::RawPixel {
            match self.concat_raw(records, staging, progress) {
                Ok(blob) => {
                    let path = staging.write_raw_blob(&blob)?;
                    drop(blob);
                    for r in records.iter_mut() {
                        r.discard(pool);
                    }
                    return Ok(StagedFrames {
                        strategy: TransportStrategy::RawPixel,
                        input: EncodeInput::RawPixels {
                            path,
                            size: self.cfg.export,
                            pixel_format: "rgba".to_string(),
                            frame_count: self.cfg.frame_count,
                        },
                        fell_back: false,
                    });
                }
                Err(CaptureError::TransportAllocation { bytes }) => {
                    tracing::warn!(bytes, "raw transport allocation failed, falling back to compressed images");
                    fell_back = true;
                }
                Err(e) => return Err(e),
            }
        } else if self.cfg.use_raw_pixels {
            tracing::info!(
                estimate = estimate_raw_bytes(self.cfg),
                threshold = self.opts.raw_threshold_bytes,
                "raw transport estimate over threshold, using compressed images"
            );
        }

        self.write_compressed(records, staging, pool, progress)?;
        let codec = self.transcoder.codec();
        Ok(StagedFrames {
            strategy: TransportStrategy::CompressedImage,
            input: EncodeInput::ImageSequence {
                dir: staging.frames_dir().to_path_buf(),
                pattern: StagingArea::image_pattern(codec),
                start_number: 1,
                frame_count: self.cfg.frame_count,
                codec,
            },
            fell_back,
        })
    }

    fn concat_raw(
        &self,
        records: &[FrameRecord],
        spill: &dyn FrameSpill,
        progress: &mut ProgressTracker<'_>,
    ) -> CaptureResult<Vec<u8>> {
        let total = estimate_raw_bytes(self.cfg);
        if let Some(limit) = self.opts.max_contiguous_alloc
            && total > limit
        {
            return Err(CaptureError::TransportAllocation { bytes: total });
        }
        let total_len = usize::try_from(total)
            .map_err(|_| CaptureError::TransportAllocation { bytes: total })?;
        let mut blob = Vec::new();
        blob.try_reserve_exact(total_len)
            .map_err(|_| CaptureError::TransportAllocation { bytes: total })?;
        blob.resize(total_len, 0);

        let frame_len = self.cfg.export.rgba_len();
        let frame_count = self.cfg.frame_count;
        let mut done = 0u64;
        for chunk in records.chunks(self.cfg.write_batch_size.max(1)) {
            for r in chunk {
                if r.index.0 >= frame_count {
                    return Err(CaptureError::validation(format!(
                        "frame index {} outside capture of {frame_count} frames",
                        r.index.0
                    )));
                }
                let px = r.pixels(spill)?;
                CaptureError::check_rgba_len(&px, self.cfg.export.width, self.cfg.export.height)?;
                let off = r.index.0 as usize * frame_len;
                blob[off..off + frame_len].copy_from_slice(&px);
            }
            done += chunk.len() as u64;
            progress.written(done, frame_count);
        }
        Ok(blob)
    }

    fn write_compressed(
        &self,
        records: &mut [FrameRecord],
        staging: &StagingArea,
        pool: &mut BufferPool,
        progress: &mut ProgressTracker<'_>,
    ) -> CaptureResult<()> {
        let export = self.cfg.export;
        let quality = self.cfg.compression_quality;
        let codec = self.transcoder.codec();
        let total = records.len() as u64;
        let mut done = 0u64;

        for chunk in records.chunks_mut(self.cfg.write_batch_size.max(1)) {
            let pixels = chunk
                .iter()
                .map(|r| Ok((r.index, r.pixels(staging)?)))
                .collect::<CaptureResult<Vec<(FrameIndex, Cow<'_, [u8]>)>>>()?;

            let encoded: Vec<(FrameIndex, Vec<u8>)> = if self.opts.parallel_transcode {
                pixels
                    .par_iter()
                    .map_init(
                        || BufferPool::new(PoolOpts::worker()),
                        |worker_pool, (index, px)| {
                            self.transcoder
                                .to_compressed_image(px, export, quality, worker_pool)
                                .map(|bytes| (*index, bytes))
                        },
                    )
                    .collect::<CaptureResult<_>>()?
            } else {
                pixels
                    .iter()
                    .map(|(index, px)| {
                        self.transcoder
                            .to_compressed_image(px, export, quality, pool)
                            .map(|bytes| (*index, bytes))
                    })
                    .collect::<CaptureResult<_>>()?
            };

            for (index, bytes) in &encoded {
                staging.write_image_frame(*index, codec, bytes)?;
            }
            drop(pixels);
            for r in chunk.iter_mut() {
                r.discard(pool);
            }
            done += chunk.len() as u64;
            progress.written(done, total);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/transport.rs"]
mod tests;
