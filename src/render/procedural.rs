use crate::foundation::core::{Fps, FrameIndex, PixelSize};
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::surface::{PixelReader, PixelRect, RenderState, RenderSurface};
use kurbo::Shape;

const BACKGROUND_BANDS: u32 = 24;
const GRAIN_STRENGTH: i16 = 18;

/// Options for [`ProceduralSurface`].
#[derive(Debug, Clone, Copy)]
pub struct ProceduralSurfaceOpts {
    /// Backing-store size. Both dimensions must fit in `u16`.
    pub size: PixelSize,
    /// Number of orbiting particles.
    pub particles: u32,
    /// Seed for particle layout and grain.
    pub seed: u64,
    /// Expose the direct colour-buffer read path. When `false`, capture uses `extract_frame`.
    pub expose_pixel_reader: bool,
}

impl ProceduralSurfaceOpts {
    /// Defaults for a surface of `size`.
    pub fn new(size: PixelSize) -> Self {
        Self {
            size,
            particles: 48,
            seed: 1,
            expose_pixel_reader: true,
        }
    }
}

#[derive(Clone, Copy)]
struct Particle {
    orbit: f64,
    speed: f64,
    phase: f64,
    radius: f64,
    rgb: [u8; 3],
}

/// CPU reference surface: banded gradient background, orbiting particles, a haze/flare effect
/// layer and a grain filter, rasterized with `vello_cpu`.
///
/// Pixels are opaque, so the premultiplied backing store is also valid straight-alpha RGBA8.
pub struct ProceduralSurface {
    opts: ProceduralSurfaceOpts,
    state: RenderState,

    ctx: Option<vello_cpu::RenderContext>,
    target: vello_cpu::Pixmap,
    particles: Vec<Particle>,
    background: Option<Vec<[u8; 3]>>,
    grain: Option<Vec<u8>>,

    frames_rendered: u64,
    texture_collections: u64,
    applied_states: Vec<RenderState>,
}

impl ProceduralSurface {
    /// Create a surface in the default (interactive) render state.
    pub fn new(opts: ProceduralSurfaceOpts) -> CaptureResult<Self> {
        let (w, h) = surface_dims(opts.size)?;
        let particles = (0..opts.particles)
            .map(|i| particle(opts.seed, i))
            .collect();
        Ok(Self {
            opts,
            state: RenderState::default(),
            ctx: None,
            target: vello_cpu::Pixmap::new(w, h),
            particles,
            background: None,
            grain: None,
            frames_rendered: 0,
            texture_collections: 0,
            applied_states: Vec::new(),
        })
    }

    /// Number of render passes executed.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Number of texture collection passes requested.
    pub fn texture_collections(&self) -> u64 {
        self.texture_collections
    }

    /// Every state applied through [`RenderSurface::apply_render_state`], in order.
    pub fn applied_states(&self) -> &[RenderState] {
        &self.applied_states
    }

    /// Animation clock for `frame`, honouring the ticker toggles.
    ///
    /// A stopped ticker holds the animation at its start; a max-fps cap below the export rate
    /// quantizes time to the capped rate.
    fn clock_secs(&self, frame: FrameIndex, fps: Fps) -> f64 {
        if !self.state.ticker_running {
            return 0.0;
        }
        match self.state.ticker_max_fps {
            Some(cap) if cap > 0 && f64::from(cap) < fps.as_f64() => {
                let ticks = frame
                    .0
                    .saturating_mul(u64::from(cap))
                    .saturating_mul(u64::from(fps.den))
                    / u64::from(fps.num.max(1));
                ticks as f64 / f64::from(cap)
            }
            _ => fps.frames_to_secs(frame.0),
        }
    }

    fn background_bands(&mut self) -> Vec<[u8; 3]> {
        if let Some(bands) = self.background.as_ref() {
            return bands.clone();
        }
        let bands: Vec<[u8; 3]> = (0..BACKGROUND_BANDS)
            .map(|i| {
                let t = f64::from(i) / f64::from(BACKGROUND_BANDS - 1);
                [
                    lerp_u8(18, 92, t),
                    lerp_u8(12, 30, t),
                    lerp_u8(48, 120, t),
                ]
            })
            .collect();
        if self.state.static_layer_cached {
            self.background = Some(bands.clone());
        }
        bands
    }

    fn apply_grain(&mut self, frame: FrameIndex) {
        let len = self.opts.size.pixel_count() as usize;
        let seed = self.opts.seed;
        let noise = self.grain.get_or_insert_with(|| {
            (0..len)
                .map(|i| (mix64(seed ^ (i as u64).wrapping_mul(0x9E37_79B9)) & 0xff) as u8)
                .collect()
        });
        // Shift the grain texture per frame so it animates without regenerating it.
        let shift = (mix64(frame.0 ^ seed) as usize) % len.max(1);
        let data = self.target.data_as_u8_slice_mut();
        for (i, px) in data.chunks_exact_mut(4).enumerate() {
            let n = i16::from(noise[(i + shift) % len]) - 128;
            let delta = n * GRAIN_STRENGTH / 128;
            for c in &mut px[..3] {
                *c = (i16::from(*c) + delta).clamp(0, 255) as u8;
            }
        }
    }
}

impl RenderSurface for ProceduralSurface {
    fn size(&self) -> PixelSize {
        self.opts.size
    }

    fn render(&mut self, frame: FrameIndex, fps: Fps) -> CaptureResult<()> {
        let (w, h) = surface_dims(self.opts.size)?;
        let t = self.clock_secs(frame, fps);
        let bands = self.background_bands();
        let width = f64::from(w);
        let height = f64::from(h);

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let band_h = height / f64::from(BACKGROUND_BANDS);
        for (i, rgb) in bands.iter().enumerate() {
            let y0 = band_h * i as f64;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                rgb[0], rgb[1], rgb[2], 255,
            ));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                y0,
                width,
                (y0 + band_h + 1.0).min(height),
            ));
        }

        let (cx, cy) = (width * 0.5, height * 0.5);
        let scale = width.min(height);
        for p in &self.particles {
            let angle = p.phase + t * p.speed;
            let x = cx + angle.cos() * p.orbit * scale;
            let y = cy + angle.sin() * p.orbit * scale;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                p.rgb[0], p.rgb[1], p.rgb[2], 255,
            ));
            fill_circle(&mut ctx, x, y, p.radius * scale);
        }

        if self.state.effect_layer_visible {
            ctx.push_opacity_layer(0.3);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(220, 210, 255, 255));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width, height * 0.4));
            let flare_x = cx + (t * 0.7).sin() * width * 0.3;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 240, 200, 255));
            fill_circle(&mut ctx, flare_x, height * 0.2, scale * 0.12);
            ctx.pop_layer();
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.target);
        self.ctx = Some(ctx);

        if self.state.filters_enabled {
            self.apply_grain(frame);
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn pixel_reader(&mut self) -> Option<&mut dyn PixelReader> {
        if self.opts.expose_pixel_reader {
            Some(self)
        } else {
            None
        }
    }

    fn extract_frame(&mut self) -> CaptureResult<Vec<u8>> {
        Ok(self.target.data_as_u8_slice().to_vec())
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn apply_render_state(&mut self, state: RenderState) -> CaptureResult<()> {
        if !state.static_layer_cached {
            self.background = None;
        }
        self.state = state;
        self.applied_states.push(state);
        Ok(())
    }

    fn collect_textures(&mut self) {
        self.grain = None;
        if !self.state.static_layer_cached {
            self.background = None;
        }
        self.texture_collections += 1;
    }
}

impl PixelReader for ProceduralSurface {
    fn read_pixels(&mut self, rect: PixelRect, dst: &mut [u8]) -> CaptureResult<()> {
        rect.check_within(self.opts.size)?;
        CaptureError::check_rgba_len(dst, rect.width, rect.height)?;

        let src = self.target.data_as_u8_slice();
        let stride = self.opts.size.width as usize * 4;
        let row_len = rect.width as usize * 4;
        for (row, out) in dst.chunks_exact_mut(row_len.max(1)).enumerate() {
            let off = (rect.y as usize + row) * stride + rect.x as usize * 4;
            out.copy_from_slice(&src[off..off + row_len]);
        }
        Ok(())
    }
}

fn surface_dims(size: PixelSize) -> CaptureResult<(u16, u16)> {
    if size.width == 0 || size.height == 0 {
        return Err(CaptureError::validation(
            "surface width/height must be non-zero",
        ));
    }
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| CaptureError::validation(format!("surface width exceeds u16: {}", size.width)))?;
    let h: u16 = size.height.try_into().map_err(|_| {
        CaptureError::validation(format!("surface height exceeds u16: {}", size.height))
    })?;
    Ok((w, h))
}

fn fill_circle(ctx: &mut vello_cpu::RenderContext, x: f64, y: f64, r: f64) {
    let circle = kurbo::Circle::new((x, y), r.max(0.5));
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in circle.path_elements(0.1) {
        p.push(el);
    }
    ctx.fill_path(&p);
}

fn particle(seed: u64, i: u32) -> Particle {
    let h = mix64(seed.wrapping_add(u64::from(i).wrapping_mul(0xA24B_AED4_963E_E407)));
    let unit = |shift: u32| ((h >> shift) & 0xffff) as f64 / 65535.0;
    Particle {
        orbit: 0.08 + unit(0) * 0.38,
        speed: 0.4 + unit(16) * 2.2,
        phase: unit(32) * std::f64::consts::TAU,
        radius: 0.006 + unit(48) * 0.02,
        rgb: [
            lerp_u8(160, 255, unit(8)),
            lerp_u8(120, 230, unit(24)),
            lerp_u8(60, 200, unit(40)),
        ],
    }
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let af = f64::from(a);
    let bf = f64::from(b);
    (af + (bf - af) * t).round().clamp(0.0, 255.0) as u8
}

fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
#[path = "../../tests/unit/render/procedural.rs"]
mod tests;
