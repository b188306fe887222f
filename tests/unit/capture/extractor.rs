use super::*;
use crate::config::{ExportSettings, QualityPreset};
use crate::render::pool::PoolOpts;
use crate::render::procedural::{ProceduralSurface, ProceduralSurfaceOpts};
use crate::render::surface::RenderState;

fn config(size: PixelSize, scale: f64) -> CaptureConfig {
    let settings = ExportSettings {
        preset: QualityPreset::High,
        frame_count: Some(4),
        resolution_scale: Some(scale),
        ..ExportSettings::default()
    };
    CaptureConfig::derive(&settings, size).unwrap()
}

fn surface(size: PixelSize, expose_pixel_reader: bool) -> ProceduralSurface {
    ProceduralSurface::new(ProceduralSurfaceOpts {
        expose_pixel_reader,
        ..ProceduralSurfaceOpts::new(size)
    })
    .unwrap()
}

struct BlankSurface {
    size: PixelSize,
    extract_len: usize,
}

impl RenderSurface for BlankSurface {
    fn size(&self) -> PixelSize {
        self.size
    }

    fn render(&mut self, _frame: FrameIndex, _fps: Fps) -> CaptureResult<()> {
        Ok(())
    }

    fn pixel_reader(&mut self) -> Option<&mut dyn crate::render::surface::PixelReader> {
        None
    }

    fn extract_frame(&mut self) -> CaptureResult<Vec<u8>> {
        Ok(vec![0; self.extract_len])
    }

    fn render_state(&self) -> RenderState {
        RenderState::default()
    }

    fn apply_render_state(&mut self, _state: RenderState) -> CaptureResult<()> {
        Ok(())
    }
}

#[test]
fn native_size_frames_come_from_the_pixel_reader() {
    let size = PixelSize::new(24, 16);
    let cfg = config(size, 1.0);
    let extractor = FrameExtractor::new(&cfg);
    let mut pool = BufferPool::new(PoolOpts::default());
    let mut s = surface(size, true);

    let frame = extractor.extract(&mut s, &mut pool, FrameIndex(2)).unwrap();
    assert_eq!(frame.len(), size.rgba_len());
    assert_eq!(frame, s.extract_frame().unwrap());
    assert_eq!(pool.stats().alloc_buffers, 1);
}

#[test]
fn hidden_reader_falls_back_to_extract_frame() {
    let size = PixelSize::new(24, 16);
    let cfg = config(size, 1.0);
    let extractor = FrameExtractor::new(&cfg);
    let mut pool = BufferPool::new(PoolOpts::default());

    let mut direct = surface(size, true);
    let mut hidden = surface(size, false);
    let a = extractor.extract(&mut direct, &mut pool, FrameIndex(1)).unwrap();
    let b = extractor.extract(&mut hidden, &mut pool, FrameIndex(1)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn downsampled_frames_have_export_length_and_recycle_the_full_buffer() {
    let size = PixelSize::new(40, 32);
    let cfg = config(size, 0.75);
    assert_eq!(cfg.export, PixelSize::new(30, 24));
    let extractor = FrameExtractor::new(&cfg);
    assert_eq!(extractor.export_size(), cfg.export);

    let mut pool = BufferPool::new(PoolOpts::default());
    let mut s = surface(size, true);
    let frame = extractor.extract(&mut s, &mut pool, FrameIndex(0)).unwrap();
    assert_eq!(frame.len(), 30 * 24 * 4);
    assert_eq!(pool.stats().retained_buffers, 1);

    extractor.extract(&mut s, &mut pool, FrameIndex(1)).unwrap();
    assert_eq!(pool.stats().alloc_buffers, 1);
    assert_eq!(pool.stats().reused, 1);
}

#[test]
fn empty_fallback_is_an_extraction_error() {
    let size = PixelSize::new(8, 8);
    let cfg = config(size, 1.0);
    let extractor = FrameExtractor::new(&cfg);
    let mut pool = BufferPool::new(PoolOpts::default());
    let mut s = BlankSurface {
        size,
        extract_len: 0,
    };

    let err = extractor.extract(&mut s, &mut pool, FrameIndex(5)).unwrap_err();
    match err {
        CaptureError::FrameExtraction {
            frame_index,
            reason,
        } => {
            assert_eq!(frame_index, 5);
            assert!(reason.contains("no direct read path"));
            assert!(reason.contains("no data"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn short_fallback_is_an_extraction_error() {
    let size = PixelSize::new(8, 8);
    let cfg = config(size, 1.0);
    let extractor = FrameExtractor::new(&cfg);
    let mut pool = BufferPool::new(PoolOpts::default());
    let mut s = BlankSurface {
        size,
        extract_len: 10,
    };
    assert!(matches!(
        extractor.extract(&mut s, &mut pool, FrameIndex(0)),
        Err(CaptureError::FrameExtraction { frame_index: 0, .. })
    ));
}
