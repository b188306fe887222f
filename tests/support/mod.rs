#![allow(dead_code)]

use framestage::{
    CaptureError, CaptureResult, Fps, FrameIndex, PixelReader, PixelRect, PixelSize, RenderState,
    RenderSurface,
};

/// Scripted surface: every frame is a flat colour that encodes its index.
pub struct MockSurface {
    size: PixelSize,
    state: RenderState,
    frame: Vec<u8>,
    pub fail_at: Option<u64>,
    pub expose_reader: bool,
    pub fail_restore: bool,
    pub rendered: Vec<u64>,
    pub applied: Vec<RenderState>,
    pub collections: u64,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: PixelSize::new(width, height),
            state: RenderState::default(),
            frame: Vec::new(),
            fail_at: None,
            expose_reader: true,
            fail_restore: false,
            rendered: Vec::new(),
            applied: Vec::new(),
            collections: 0,
        }
    }

    pub fn failing_at(mut self, frame: u64) -> Self {
        self.fail_at = Some(frame);
        self
    }

    pub fn without_reader(mut self) -> Self {
        self.expose_reader = false;
        self
    }

    pub fn state(&self) -> RenderState {
        self.state
    }
}

/// Pixel value used for frame `index`.
pub fn frame_pixel(index: u64) -> [u8; 4] {
    [index as u8, (index >> 8) as u8, 0x5A, 255]
}

/// Split a raw blob into frames and check every frame carries its own index.
pub fn assert_blob_in_order(blob: &[u8], size: PixelSize, frames: u64) {
    let frame_len = size.rgba_len();
    assert_eq!(blob.len(), frame_len * frames as usize);
    for (i, frame) in blob.chunks_exact(frame_len).enumerate() {
        let expected = frame_pixel(i as u64);
        assert!(
            frame.chunks_exact(4).all(|px| px == expected),
            "frame {i} does not carry its index"
        );
    }
}

impl RenderSurface for MockSurface {
    fn size(&self) -> PixelSize {
        self.size
    }

    fn render(&mut self, frame: FrameIndex, _fps: Fps) -> CaptureResult<()> {
        if self.fail_at == Some(frame.0) {
            return Err(CaptureError::validation(format!(
                "scripted failure at frame {}",
                frame.0
            )));
        }
        let px = frame_pixel(frame.0);
        self.frame.clear();
        for _ in 0..self.size.pixel_count() {
            self.frame.extend_from_slice(&px);
        }
        self.rendered.push(frame.0);
        Ok(())
    }

    fn pixel_reader(&mut self) -> Option<&mut dyn PixelReader> {
        if self.expose_reader { Some(self) } else { None }
    }

    fn extract_frame(&mut self) -> CaptureResult<Vec<u8>> {
        Ok(self.frame.clone())
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn apply_render_state(&mut self, state: RenderState) -> CaptureResult<()> {
        self.applied.push(state);
        if self.fail_restore && state == RenderState::default() {
            return Err(CaptureError::validation("scripted restore failure"));
        }
        self.state = state;
        Ok(())
    }

    fn collect_textures(&mut self) {
        self.collections += 1;
    }
}

impl PixelReader for MockSurface {
    fn read_pixels(&mut self, rect: PixelRect, dst: &mut [u8]) -> CaptureResult<()> {
        rect.check_within(self.size)?;
        if rect != PixelRect::full(self.size) {
            return Err(CaptureError::validation("mock only reads full frames"));
        }
        CaptureError::check_rgba_len(dst, rect.width, rect.height)?;
        dst.copy_from_slice(&self.frame);
        Ok(())
    }
}
