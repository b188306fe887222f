use crate::capture::cancel::CancelToken;
use crate::capture::extractor::FrameExtractor;
use crate::capture::progress::ProgressTracker;
use crate::config::CaptureConfig;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::pool::BufferPool;
use crate::render::surface::RenderSurface;
use futures::stream::{FuturesUnordered, StreamExt};
use std::borrow::Cow;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Payloads of frames more than this many batches old are spilled out of memory.
pub const RELEASE_AFTER_BATCHES: usize = 6;
/// A reclamation pass runs after every this many batches.
pub const RECLAIM_EVERY_BATCHES: usize = 2;
/// Extraction tasks yield to the executor every this many frames.
pub const DEFAULT_YIELD_EVERY: u64 = 30;

/// One captured frame.
///
/// A spilled record has an empty payload; its bytes live in a [`FrameSpill`] under its index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRecord {
    /// 0-based frame index.
    pub index: FrameIndex,
    /// RGBA8 pixels at export size, or compressed image bytes.
    pub payload: Vec<u8>,
    /// `true` while `payload` holds raw pixels.
    pub is_raw_pixel: bool,
    spilled: bool,
}

impl FrameRecord {
    /// Record holding raw pixels.
    pub fn raw(index: FrameIndex, payload: Vec<u8>) -> Self {
        Self {
            index,
            payload,
            is_raw_pixel: true,
            spilled: false,
        }
    }

    /// Whether the payload was moved out to a spill store.
    pub fn is_spilled(&self) -> bool {
        self.spilled
    }

    /// Payload bytes, read back from `spill` when the record was released.
    pub fn pixels<'a>(&'a self, spill: &dyn FrameSpill) -> CaptureResult<Cow<'a, [u8]>> {
        if self.spilled {
            return spill.restore(self.index).map(Cow::Owned);
        }
        Ok(Cow::Borrowed(&self.payload))
    }

    /// Move the payload into `spill` and hand the buffer back to `pool`.
    pub fn release(&mut self, spill: &mut dyn FrameSpill, pool: &mut BufferPool) -> CaptureResult<()> {
        if self.spilled {
            return Ok(());
        }
        spill.spill(self.index, &self.payload)?;
        pool.release_buffer(std::mem::take(&mut self.payload));
        self.spilled = true;
        Ok(())
    }

    /// Drop the payload for good, returning the buffer to `pool`.
    pub fn discard(&mut self, pool: &mut BufferPool) {
        pool.release_buffer(std::mem::take(&mut self.payload));
    }
}

/// Out-of-memory store for released frame payloads.
pub trait FrameSpill {
    /// Persist `payload` under `index`.
    fn spill(&mut self, index: FrameIndex, payload: &[u8]) -> CaptureResult<()>;
    /// Read back the payload persisted under `index`.
    fn restore(&self, index: FrameIndex) -> CaptureResult<Vec<u8>>;
}

/// Batch scheduling knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerOpts {
    /// Frames extracted concurrently per batch.
    pub batch_size: usize,
    /// Yield to the executor every this many frames; `0` never yields.
    pub yield_every: u64,
    /// Spill payloads of frames older than this many batches.
    pub release_after_batches: usize,
    /// Run a reclamation pass every this many batches; `0` disables it.
    pub reclaim_every: usize,
}

impl SchedulerOpts {
    /// Defaults for `cfg`.
    pub fn for_config(cfg: &CaptureConfig) -> Self {
        Self {
            batch_size: cfg.batch_size,
            yield_every: DEFAULT_YIELD_EVERY,
            release_after_batches: RELEASE_AFTER_BATCHES,
            reclaim_every: RECLAIM_EVERY_BATCHES,
        }
    }
}

/// Borrowed resources a capture run works on.
pub struct CaptureTargets<'a, 'p> {
    /// Surface frames are rendered on.
    pub surface: &'a mut dyn RenderSurface,
    /// Session pool.
    pub pool: &'a mut BufferPool,
    /// Where released payloads go.
    pub spill: &'a mut dyn FrameSpill,
    /// Progress reporting.
    pub progress: &'a mut ProgressTracker<'p>,
}

/// Partitions the timeline into batches and extracts each batch as a group of concurrent tasks.
pub struct BatchScheduler {
    opts: SchedulerOpts,
    extractor: FrameExtractor,
    cancel: CancelToken,
}

impl BatchScheduler {
    /// Create a scheduler.
    pub fn new(opts: SchedulerOpts, extractor: FrameExtractor, cancel: CancelToken) -> Self {
        Self {
            opts,
            extractor,
            cancel,
        }
    }

    /// Capture frames `[0, frame_count)` and return them sorted by index.
    ///
    /// The first failing task aborts the run with `BatchCapture`; frames already captured are
    /// dropped with the returned error.
    pub async fn run(
        &self,
        frame_count: u64,
        targets: CaptureTargets<'_, '_>,
    ) -> CaptureResult<Vec<FrameRecord>> {
        if self.opts.batch_size == 0 {
            return Err(CaptureError::validation("batch_size must be > 0"));
        }
        let CaptureTargets {
            surface,
            pool,
            spill,
            progress,
        } = targets;

        let batch_size = self.opts.batch_size;
        let mut records: Vec<FrameRecord> = Vec::with_capacity(frame_count as usize);
        let mut released = 0usize;

        for (batch_no, range) in FrameRange::first(frame_count)
            .chunks(batch_size as u64)
            .enumerate()
        {
            self.cancel.check()?;
            self.run_batch(range, &mut *surface, &mut *pool, &mut records)
                .await?;
            progress.captured(range.end.0, frame_count);

            let completed = batch_no + 1;
            if self.opts.reclaim_every > 0 && completed.is_multiple_of(self.opts.reclaim_every) {
                surface.collect_textures();
                let freed = pool.trim();
                tracing::debug!(completed, freed, "reclamation pass");
            }

            if completed > self.opts.release_after_batches {
                // Batches complete in order, so record positions below the cutoff hold
                // exactly the frames below it.
                let cutoff = (completed - self.opts.release_after_batches) * batch_size;
                for record in &mut records[released..cutoff] {
                    record.release(&mut *spill, &mut *pool)?;
                }
                if cutoff > released {
                    tracing::debug!(from = released, to = cutoff, "released frame payloads");
                }
                released = released.max(cutoff);
            }
        }

        records.sort_unstable_by_key(|r| r.index);
        Ok(records)
    }

    async fn run_batch(
        &self,
        range: FrameRange,
        surface: &mut dyn RenderSurface,
        pool: &mut BufferPool,
        records: &mut Vec<FrameRecord>,
    ) -> CaptureResult<()> {
        let shared = RefCell::new((surface, pool));
        let extractor = &self.extractor;
        let yield_every = self.opts.yield_every;

        let mut tasks: FuturesUnordered<_> = range
            .indices()
            .map(|index| {
                let shared = &shared;
                async move {
                    if yield_every > 0 && index.0 > 0 && index.0.is_multiple_of(yield_every) {
                        YieldNow::default().await;
                    }
                    let mut guard = shared.borrow_mut();
                    let (surface, pool) = &mut *guard;
                    let result = extractor.extract(&mut **surface, &mut **pool, index);
                    (index, result)
                }
            })
            .collect();

        while let Some((index, result)) = tasks.next().await {
            match result {
                Ok(payload) => records.push(FrameRecord::raw(index, payload)),
                Err(e) => return Err(CaptureError::batch_capture(index.0, e)),
            }
        }
        Ok(())
    }
}

/// Future that returns `Pending` once, letting sibling tasks run.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/scheduler.rs"]
mod tests;
