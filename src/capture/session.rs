use crate::capture::cancel::CancelToken;
use crate::capture::extractor::FrameExtractor;
use crate::capture::progress::{CapturePhase, ProgressPlan, ProgressTracker, StatusSink};
use crate::capture::scheduler::{BatchScheduler, CaptureTargets, DEFAULT_YIELD_EVERY, SchedulerOpts};
use crate::capture::transport::{FrameTransport, TransportOpts, TransportStrategy};
use crate::config::CaptureConfig;
use crate::encode::encoder::{AudioTrack, EncodeJob, VideoEncoder};
use crate::encode::staging::StagingArea;
use crate::foundation::error::{CaptureError, CaptureResult};
use crate::render::pool::{BufferPool, PoolOpts, PoolStats};
use crate::render::surface::{RenderState, RenderSurface};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// Session tuning that is not part of the capture configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOpts {
    /// Session pool caps.
    pub pool: PoolOpts,
    /// Extraction tasks yield every this many frames.
    pub yield_every: u64,
    /// Write-stage knobs.
    pub transport: TransportOpts,
    /// Progress split between phases.
    pub progress: ProgressPlan,
    /// Parent directory for the staging area. `None` uses the system temp dir.
    pub staging_root: Option<PathBuf>,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            pool: PoolOpts::default(),
            yield_every: DEFAULT_YIELD_EVERY,
            transport: TransportOpts::default(),
            progress: ProgressPlan::default(),
            staging_root: None,
        }
    }
}

/// Companion audio handed to the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioInput {
    /// Encoded audio file contents.
    pub data: Vec<u8>,
    /// File extension the encoder should see, e.g. `mp3`.
    pub extension: String,
    /// Loop the track for the full video length.
    pub looped: bool,
}

impl AudioInput {
    /// Read an audio file, taking the extension from its name.
    pub fn from_path(path: &Path, looped: bool) -> CaptureResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                CaptureError::validation(format!(
                    "audio file '{}' has no extension",
                    path.display()
                ))
            })?
            .to_string();
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read audio '{}'", path.display()))?;
        Ok(Self {
            data,
            extension,
            looped,
        })
    }
}

/// Successful export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOutput {
    /// Encoded container bytes.
    pub bytes: Vec<u8>,
    /// Transport the frames actually used.
    pub transport: TransportStrategy,
    /// Raw transport was attempted and abandoned.
    pub fell_back: bool,
    /// Number of frames encoded.
    pub frames: u64,
}

/// Drives one export over a borrowed surface.
///
/// The surface's render state is saved when capture starts and re-applied on every exit path,
/// including drop. A session runs at most one export.
pub struct CaptureSession<'s> {
    cfg: CaptureConfig,
    opts: SessionOpts,
    surface: &'s mut dyn RenderSurface,

    phase: CapturePhase,
    progress: f64,
    saved: Option<RenderState>,
    restored: bool,

    pool: BufferPool,
    cancel: CancelToken,
}

impl<'s> CaptureSession<'s> {
    /// Create a session. The surface size must match `cfg.source`.
    pub fn new(
        cfg: CaptureConfig,
        surface: &'s mut dyn RenderSurface,
        opts: SessionOpts,
    ) -> CaptureResult<Self> {
        cfg.validate()?;
        if surface.size() != cfg.source {
            return Err(CaptureError::validation(format!(
                "surface is {}, configuration expects {}",
                surface.size(),
                cfg.source
            )));
        }
        let pool = BufferPool::new(opts.pool);
        Ok(Self {
            cfg,
            opts,
            surface,
            phase: CapturePhase::Idle,
            progress: 0.0,
            saved: None,
            restored: false,
            pool,
            cancel: CancelToken::new(),
        })
    }

    /// Configuration the session runs on.
    pub fn config(&self) -> &CaptureConfig {
        &self.cfg
    }

    /// Current phase.
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Last reported overall progress.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Token that cancels this session's export between batches.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Session pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Save the surface's render state (once) and switch it to the capture state.
    pub fn suspend_effects(&mut self) -> CaptureResult<()> {
        let saved = match self.saved {
            Some(saved) => saved,
            None => {
                let current = self.surface.render_state();
                self.saved = Some(current);
                current
            }
        };
        self.restored = false;
        self.surface.apply_render_state(saved.for_capture())
    }

    /// Re-apply the saved render state. Idempotent; failures are logged, never returned.
    pub fn restore_render_state(&mut self) {
        let Some(saved) = self.saved else {
            return;
        };
        if let Err(e) = self.surface.apply_render_state(saved) {
            let err = CaptureError::state_restore(e.to_string());
            tracing::warn!(error = %err, "render state not restored");
        }
        self.restored = true;
    }

    /// Capture every frame, stage it and run `encoder`.
    ///
    /// Whatever happens, the render state is restored and the staging area removed before this
    /// returns. Errors are surfaced once, after cleanup.
    #[tracing::instrument(skip_all, fields(frames = self.cfg.frame_count, export = %self.cfg.export))]
    pub fn export(
        &mut self,
        encoder: &mut dyn VideoEncoder,
        audio: Option<&AudioInput>,
        status: &mut dyn StatusSink,
    ) -> CaptureResult<ExportOutput> {
        match self.phase {
            CapturePhase::Idle => {}
            phase if phase.is_terminal() => {
                return Err(CaptureError::validation(format!(
                    "export already ran (phase {phase:?})"
                )));
            }
            phase => {
                return Err(CaptureError::validation(format!(
                    "export already in progress (phase {phase:?})"
                )));
            }
        }

        let mut tracker = ProgressTracker::new(self.opts.progress, status);
        let mut staging = None;
        let result = self.run_phases(&mut staging, encoder, audio, &mut tracker);

        let result = self.advance(CapturePhase::CleaningUp, &mut tracker).and(result);
        self.restore_render_state();
        if let Some(staging) = staging.take()
            && let Err(e) = staging.close()
        {
            tracing::warn!(error = %e, "staging area not removed");
        }

        self.phase = if result.is_ok() {
            CapturePhase::Done
        } else {
            CapturePhase::Failed
        };
        tracker.phase(self.phase);
        self.progress = tracker.last();

        match &result {
            Ok(out) => tracing::info!(bytes = out.bytes.len(), transport = ?out.transport, "export finished"),
            Err(e) => tracing::warn!(error = %e, "export failed"),
        }
        result
    }

    fn run_phases(
        &mut self,
        staging: &mut Option<StagingArea>,
        encoder: &mut dyn VideoEncoder,
        audio: Option<&AudioInput>,
        tracker: &mut ProgressTracker<'_>,
    ) -> CaptureResult<ExportOutput> {
        self.advance(CapturePhase::Capturing, tracker)?;
        self.suspend_effects()?;
        let staging = staging.insert(StagingArea::new_in(self.opts.staging_root.as_deref())?);

        let scheduler = BatchScheduler::new(
            SchedulerOpts {
                yield_every: self.opts.yield_every,
                ..SchedulerOpts::for_config(&self.cfg)
            },
            FrameExtractor::new(&self.cfg),
            self.cancel.clone(),
        );
        let mut records = pollster::block_on(scheduler.run(
            self.cfg.frame_count,
            CaptureTargets {
                surface: &mut *self.surface,
                pool: &mut self.pool,
                spill: &mut *staging,
                progress: &mut *tracker,
            },
        ))?;

        self.cancel.check()?;
        self.advance(CapturePhase::Writing, tracker)?;
        let transport = FrameTransport::new(&self.cfg, self.opts.transport);
        let staged = transport.stage(&mut records, staging, &mut self.pool, tracker)?;
        drop(records);
        let audio = match audio {
            Some(a) => Some(AudioTrack {
                path: staging.stage_audio(&a.data, &a.extension)?,
                looped: a.looped,
            }),
            None => None,
        };

        self.cancel.check()?;
        self.advance(CapturePhase::Encoding, tracker)?;
        let job = EncodeJob {
            fps: self.cfg.fps,
            input: staged.input,
            audio,
            params: self.cfg.encoder.clone(),
            output_path: staging.output_path(),
        };
        let bytes = encoder.encode(&job)?;
        tracker.encoded();

        Ok(ExportOutput {
            bytes,
            transport: staged.strategy,
            fell_back: staged.fell_back,
            frames: self.cfg.frame_count,
        })
    }

    fn advance(&mut self, next: CapturePhase, tracker: &mut ProgressTracker<'_>) -> CaptureResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CaptureError::Other(anyhow::anyhow!(
                "illegal capture phase transition {:?} -> {next:?}",
                self.phase
            )));
        }
        tracing::debug!(from = ?self.phase, to = ?next, "capture phase");
        self.phase = next;
        tracker.phase(next);
        Ok(())
    }
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        if self.saved.is_some() && !self.restored {
            self.restore_render_state();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
