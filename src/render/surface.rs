use crate::foundation::core::{Fps, FrameIndex, PixelSize};
use crate::foundation::error::{CaptureError, CaptureResult};

/// Render toggles that an export session saves before capture and restores afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderState {
    /// Post-processing filter chain (grain and similar) enabled.
    pub filters_enabled: bool,
    /// Secondary effect layer (haze, flare) visible.
    pub effect_layer_visible: bool,
    /// Static background layer cached between frames.
    pub static_layer_cached: bool,
    /// Animation ticker advancing.
    pub ticker_running: bool,
    /// Ticker max-fps cap. `None` means uncapped.
    pub ticker_max_fps: Option<u32>,
    /// Ticker min-fps floor. `None` means no floor.
    pub ticker_min_fps: Option<u32>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            filters_enabled: true,
            effect_layer_visible: true,
            static_layer_cached: false,
            ticker_running: true,
            ticker_max_fps: Some(60),
            ticker_min_fps: None,
        }
    }
}

impl RenderState {
    /// State used while capturing: expensive effects off, caps removed, ticker advancing.
    pub fn for_capture(self) -> Self {
        Self {
            filters_enabled: false,
            effect_layer_visible: false,
            static_layer_cached: true,
            ticker_running: true,
            ticker_max_fps: None,
            ticker_min_fps: None,
        }
    }
}

/// Rectangle in surface pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Rectangle covering a whole surface of `size`.
    pub fn full(size: PixelSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// Byte length of the RGBA8 pixels inside the rectangle.
    pub fn rgba_len(self) -> usize {
        PixelSize::new(self.width, self.height).rgba_len()
    }

    /// Return an error unless the rectangle lies inside `size`.
    pub fn check_within(self, size: PixelSize) -> CaptureResult<()> {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        if right > u64::from(size.width) || bottom > u64::from(size.height) {
            return Err(CaptureError::validation(format!(
                "read rect {}x{}+{}+{} exceeds surface {size}",
                self.width, self.height, self.x, self.y
            )));
        }
        Ok(())
    }
}

/// Low-level colour-buffer read path exposed by some surfaces.
pub trait PixelReader {
    /// Copy the RGBA8 pixels of `rect` into `dst` (`dst.len() == rect.rgba_len()`).
    ///
    /// Rows are written top to bottom in the surface's native scanline order.
    fn read_pixels(&mut self, rect: PixelRect, dst: &mut [u8]) -> CaptureResult<()>;
}

/// A rendering surface that an export session captures from.
///
/// The session holds exclusive access to the surface for its whole duration.
pub trait RenderSurface {
    /// Native backing-store size.
    fn size(&self) -> PixelSize;

    /// Synchronously render the animation at `frame` so the backing store is current.
    fn render(&mut self, frame: FrameIndex, fps: Fps) -> CaptureResult<()>;

    /// Direct colour-buffer read path, if the surface exposes one.
    fn pixel_reader(&mut self) -> Option<&mut dyn PixelReader>;

    /// Higher-level "extract current frame" call returning native-size RGBA8.
    fn extract_frame(&mut self) -> CaptureResult<Vec<u8>>;

    /// Current render toggles.
    fn render_state(&self) -> RenderState;

    /// Apply render toggles.
    fn apply_render_state(&mut self, state: RenderState) -> CaptureResult<()>;

    /// Release GPU/texture resources that are no longer referenced.
    fn collect_textures(&mut self) {}
}
