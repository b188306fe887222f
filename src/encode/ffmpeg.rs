use crate::encode::encoder::{EncodeInput, EncodeJob, VideoEncoder};
use crate::foundation::error::{CaptureError, CaptureResult};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Encoder that runs the system `ffmpeg` once per job and returns the MP4 bytes.
///
/// Output is h264 in an MP4 container with `+faststart`.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Use `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific `ffmpeg` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for `job`, without the program name.
    pub fn build_args(job: &EncodeJob) -> CaptureResult<Vec<OsString>> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        let rate = job.fps.to_ffmpeg_rate();

        match &job.input {
            EncodeInput::ImageSequence {
                dir,
                pattern,
                start_number,
                frame_count,
                ..
            } => {
                if *frame_count == 0 {
                    return Err(CaptureError::validation("image sequence is empty"));
                }
                args.extend(["-framerate".into(), rate.clone().into()]);
                args.extend(["-start_number".into(), start_number.to_string().into()]);
                args.push("-i".into());
                args.push(dir.join(pattern).into_os_string());
            }
            EncodeInput::RawPixels {
                path,
                size,
                pixel_format,
                ..
            } => {
                if !size.width.is_multiple_of(2) || !size.height.is_multiple_of(2) {
                    return Err(CaptureError::validation(
                        "raw input width/height must be even (required for yuv420p mp4 output)",
                    ));
                }
                args.extend([
                    "-f".into(),
                    "rawvideo".into(),
                    "-pix_fmt".into(),
                    pixel_format.into(),
                    "-s".into(),
                    size.to_string().into(),
                ]);
                // For rawvideo input `-r` before `-i` declares the input rate.
                args.extend(["-r".into(), rate.clone().into()]);
                args.push("-i".into());
                args.push(path.clone().into_os_string());
            }
        }

        if let Some(audio) = job.audio.as_ref() {
            if audio.looped {
                args.extend(["-stream_loop".into(), "-1".into()]);
            }
            args.push("-i".into());
            args.push(audio.path.clone().into_os_string());
            args.extend([
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
            ]);
        }

        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            job.params.preset.clone().into(),
            "-crf".into(),
            job.params.crf.to_string().into(),
            "-pix_fmt".into(),
            job.params.pixel_format.clone().into(),
        ]);
        if job.audio.is_some() {
            args.extend([
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                job.params.audio_bitrate.clone().into(),
                "-shortest".into(),
            ]);
        } else {
            args.push("-an".into());
        }
        args.extend(["-movflags".into(), "+faststart".into()]);
        args.push(job.output_path.clone().into_os_string());
        Ok(args)
    }
}

impl VideoEncoder for FfmpegEncoder {
    #[tracing::instrument(skip_all, fields(frames = job.input.frame_count(), raw = job.input.is_raw()))]
    fn encode(&mut self, job: &EncodeJob) -> CaptureResult<Vec<u8>> {
        let args = Self::build_args(job)?;
        ensure_parent_dir(&job.output_path)?;

        if !is_program_runnable(&self.program) {
            return Err(CaptureError::encoding(format!(
                "'{}' is required for MP4 encoding, but could not be run",
                self.program.display()
            )));
        }

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CaptureError::encoding(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptureError::encoding("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        let status = child
            .wait()
            .map_err(|e| CaptureError::encoding(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| CaptureError::encoding("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| CaptureError::encoding(format!("ffmpeg stderr read failed: {e}")))?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(CaptureError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let bytes = std::fs::read(&job.output_path).map_err(|e| {
            CaptureError::encoding(format!(
                "ffmpeg produced no readable output at '{}': {e}",
                job.output_path.display()
            ))
        })?;
        if bytes.is_empty() {
            return Err(CaptureError::encoding("ffmpeg produced an empty file"));
        }
        tracing::debug!(bytes = bytes.len(), "ffmpeg finished");
        Ok(bytes)
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CaptureResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_runnable(Path::new("ffmpeg"))
}

fn is_program_runnable(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
