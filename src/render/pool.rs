use crate::foundation::core::PixelSize;
use image::RgbaImage;
use std::collections::HashMap;

/// Retention caps for [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOpts {
    /// Maximum number of idle pixel buffers kept for reuse.
    pub max_buffers: usize,
    /// Maximum number of idle drawing surfaces kept for reuse, across all sizes.
    pub max_surfaces: usize,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            max_buffers: 4,
            max_surfaces: 2,
        }
    }
}

impl PoolOpts {
    /// Smaller caps for short-lived per-worker pools.
    pub fn worker() -> Self {
        Self {
            max_buffers: 1,
            max_surfaces: 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Allocation and retention counters.
pub struct PoolStats {
    /// Idle buffers currently held.
    pub retained_buffers: usize,
    /// Idle surfaces currently held.
    pub retained_surfaces: usize,
    /// Buffers allocated because no idle buffer fit.
    pub alloc_buffers: u64,
    /// Surfaces allocated because no idle surface matched.
    pub alloc_surfaces: u64,
    /// Acquisitions served from the idle set.
    pub reused: u64,
    /// Releases dropped because the idle set was full.
    pub dropped_on_release: u64,
}

struct Bucket {
    surfaces: Vec<RgbaImage>,
}

/// Session-scoped pool of RGBA pixel buffers and off-screen drawing surfaces.
///
/// `acquire_*`/`release_*` hand ownership back and forth; a pooled value is never shared. Buffers
/// come back with stale contents (callers overwrite the full region), surfaces come back cleared.
/// Not thread-safe: parallel workers own their own pool.
pub struct BufferPool {
    opts: PoolOpts,
    stats: PoolStats,

    buffers: Vec<Vec<u8>>,
    bucket_idx_by_size: HashMap<PixelSize, usize>,
    buckets: Vec<Bucket>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new(opts: PoolOpts) -> Self {
        Self {
            opts,
            stats: PoolStats::default(),
            buffers: Vec::new(),
            bucket_idx_by_size: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }

    /// Take a buffer of exactly `len` bytes.
    pub fn acquire_buffer(&mut self, len: usize) -> Vec<u8> {
        let best = self
            .buffers
            .iter()
            .enumerate()
            .filter(|(_, b)| b.capacity() >= len)
            .min_by_key(|(_, b)| b.capacity())
            .map(|(i, _)| i);
        if let Some(i) = best {
            let mut buf = self.buffers.swap_remove(i);
            buf.resize(len, 0);
            self.stats.retained_buffers = self.buffers.len();
            self.stats.reused = self.stats.reused.saturating_add(1);
            return buf;
        }

        self.stats.alloc_buffers = self.stats.alloc_buffers.saturating_add(1);
        vec![0u8; len]
    }

    /// Hand a buffer back. Dropped when the idle set is full.
    pub fn release_buffer(&mut self, buf: Vec<u8>) {
        if buf.capacity() == 0 {
            return;
        }
        if self.buffers.len() >= self.opts.max_buffers {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }
        self.buffers.push(buf);
        self.stats.retained_buffers = self.buffers.len();
    }

    /// Take a cleared drawing surface of `size`.
    pub fn acquire_surface(&mut self, size: PixelSize) -> RgbaImage {
        if let Some(&bi) = self.bucket_idx_by_size.get(&size)
            && let Some(surface) = self.buckets[bi].surfaces.pop()
        {
            self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
            self.stats.reused = self.stats.reused.saturating_add(1);
            return surface;
        }

        self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
        RgbaImage::new(size.width, size.height)
    }

    /// Clear a drawing surface and hand it back. Dropped when the idle set is full.
    pub fn release_surface(&mut self, mut surface: RgbaImage) {
        if self.stats.retained_surfaces >= self.opts.max_surfaces {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        surface.fill(0);
        let size = PixelSize::new(surface.width(), surface.height());
        let bi = match self.bucket_idx_by_size.get(&size).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_size.insert(size, i);
                i
            }
        };
        self.buckets[bi].surfaces.push(surface);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
    }

    /// Drop every idle resource. Returns how many were released to the allocator.
    pub fn trim(&mut self) -> usize {
        let freed = self.buffers.len() + self.stats.retained_surfaces;
        self.buffers.clear();
        for bucket in &mut self.buckets {
            bucket.surfaces.clear();
        }
        self.stats.retained_buffers = 0;
        self.stats.retained_surfaces = 0;
        freed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pool.rs"]
mod tests;
