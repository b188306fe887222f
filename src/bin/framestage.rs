use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use framestage::{
    AudioInput, CaptureConfig, CaptureSession, ExportSettings, FfmpegEncoder, FrameExtractor,
    FrameIndex, PixelSize, PoolOpts, ProceduralSurface, ProceduralSurfaceOpts, QualityPreset,
    RenderSurface, SessionOpts, StatusEvent, BufferPool,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framestage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a single frame of the reference animation as a PNG.
    Frame(FrameArgs),
    /// Export the reference animation to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct SurfaceArgs {
    /// Surface width in pixels.
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 1920)]
    height: u32,

    /// Number of orbiting particles.
    #[arg(long, default_value_t = 48)]
    particles: u32,

    /// Layout seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Hide the direct pixel-read path so capture uses frame extraction.
    #[arg(long)]
    no_pixel_reader: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    surface: SurfaceArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Quality preset, which sets the export resolution.
    #[arg(long, value_enum, default_value_t = PresetChoice::High)]
    preset: PresetChoice,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    surface: SurfaceArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Export settings JSON. Flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Quality preset.
    #[arg(long, value_enum)]
    preset: Option<PresetChoice>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Clip duration in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Exact number of frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Companion audio file.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Loop the audio for the full video length.
    #[arg(long)]
    loop_audio: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetChoice {
    Draft,
    Standard,
    High,
    Lossless,
}

impl From<PresetChoice> for QualityPreset {
    fn from(value: PresetChoice) -> Self {
        match value {
            PresetChoice::Draft => QualityPreset::Draft,
            PresetChoice::Standard => QualityPreset::Standard,
            PresetChoice::High => QualityPreset::High,
            PresetChoice::Lossless => QualityPreset::Lossless,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn make_surface(args: &SurfaceArgs) -> anyhow::Result<ProceduralSurface> {
    let opts = ProceduralSurfaceOpts {
        particles: args.particles,
        seed: args.seed,
        expose_pixel_reader: !args.no_pixel_reader,
        ..ProceduralSurfaceOpts::new(PixelSize::new(args.width, args.height))
    };
    Ok(ProceduralSurface::new(opts)?)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut surface = make_surface(&args.surface)?;
    let settings = ExportSettings {
        preset: args.preset.into(),
        frame_count: Some(args.frame + 1),
        ..ExportSettings::default()
    };
    let cfg = CaptureConfig::derive(&settings, surface.size())?;

    let saved = surface.render_state();
    surface.apply_render_state(saved.for_capture())?;
    let mut pool = BufferPool::new(PoolOpts::default());
    let extracted =
        FrameExtractor::new(&cfg).extract(&mut surface, &mut pool, FrameIndex(args.frame));
    surface.apply_render_state(saved)?;
    let rgba = extracted?;

    let img = image::RgbaImage::from_raw(cfg.export.width, cfg.export.height, rgba)
        .context("extracted frame has unexpected size")?;
    framestage::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    img.save(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut settings = match args.settings.as_ref() {
        Some(path) => ExportSettings::from_path(path)?,
        None => ExportSettings::default(),
    };
    if let Some(preset) = args.preset {
        settings.preset = preset.into();
    }
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(duration) = args.duration {
        settings.duration_secs = duration;
    }
    if let Some(frames) = args.frames {
        settings.frame_count = Some(frames);
    }
    if let Some(audio) = args.audio {
        settings.audio_path = Some(audio);
    }
    settings.audio_loop |= args.loop_audio;

    let audio = settings
        .audio_path
        .as_deref()
        .map(|path| AudioInput::from_path(path, settings.audio_loop))
        .transpose()?;

    let mut surface = make_surface(&args.surface)?;
    let cfg = CaptureConfig::derive(&settings, surface.size())?;
    let export = cfg.export;
    let frames = cfg.frame_count;
    tracing::info!(preset = settings.preset.name(), %export, frames, "render starting");

    let mut session = CaptureSession::new(cfg, &mut surface, SessionOpts::default())?;
    let mut last_pct = -1i64;
    let mut status = |event: StatusEvent| match event {
        StatusEvent::Phase(phase) => eprintln!("{phase:?}"),
        StatusEvent::Progress(p) => {
            let pct = p.floor() as i64;
            if pct / 10 != last_pct / 10 {
                eprintln!("  {pct}%");
                last_pct = pct;
            }
        }
    };
    let mut encoder = FfmpegEncoder::new();
    let output = session.export(&mut encoder, audio.as_ref(), &mut status)?;

    framestage::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &output.bytes)
        .with_context(|| format!("write mp4 '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({frames} frames at {export}, {:?}{})",
        args.out.display(),
        output.transport,
        if output.fell_back { ", fell back" } else { "" }
    );
    Ok(())
}
