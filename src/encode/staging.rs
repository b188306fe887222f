use crate::capture::scheduler::FrameSpill;
use crate::capture::transcode::ImageCodec;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CaptureError, CaptureResult};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

const FRAMES_DIR: &str = "frames";
const SPILL_DIR: &str = "spill";
const RAW_BLOB: &str = "frames.rgba";
const OUTPUT_FILE: &str = "output.mp4";

/// Per-session scratch directory for staged frames, spilled payloads, audio and encoder output.
///
/// Backed by a [`tempfile::TempDir`]; the directory and everything in it is removed on drop, so
/// every exit path cleans up. [`StagingArea::close`] does the same but reports failures.
pub struct StagingArea {
    dir: tempfile::TempDir,
    frames: PathBuf,
    spill: PathBuf,
}

impl StagingArea {
    /// Create a staging directory under the system temp dir.
    pub fn new() -> CaptureResult<Self> {
        Self::new_in(None)
    }

    /// Create a staging directory under `root`, or the system temp dir when `None`.
    pub fn new_in(root: Option<&Path>) -> CaptureResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("framestage_");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).with_context(|| {
                    format!("failed to create staging root '{}'", root.display())
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("failed to create staging directory")?;

        let frames = dir.path().join(FRAMES_DIR);
        let spill = dir.path().join(SPILL_DIR);
        for sub in [&frames, &spill] {
            std::fs::create_dir_all(sub)
                .with_context(|| format!("failed to create '{}'", sub.display()))?;
        }
        tracing::debug!(path = %dir.path().display(), "staging area created");
        Ok(Self { dir, frames, spill })
    }

    /// Root of the staging directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory holding compressed frames.
    pub fn frames_dir(&self) -> &Path {
        &self.frames
    }

    /// printf-style pattern matching the names written by [`Self::write_image_frame`].
    pub fn image_pattern(codec: ImageCodec) -> String {
        format!("frame_%05d.{}", codec.extension())
    }

    /// Write one compressed frame as `frame_{seq:05}.{ext}`, `seq` being 1-based.
    pub fn write_image_frame(
        &self,
        index: FrameIndex,
        codec: ImageCodec,
        bytes: &[u8],
    ) -> CaptureResult<PathBuf> {
        let path = self.frames.join(format!(
            "frame_{:05}.{}",
            index.sequence_number(),
            codec.extension()
        ));
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write frame '{}'", path.display()))?;
        Ok(path)
    }

    /// Write the contiguous raw-pixel blob.
    pub fn write_raw_blob(&self, bytes: &[u8]) -> CaptureResult<PathBuf> {
        let path = self.dir.path().join(RAW_BLOB);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write raw blob '{}'", path.display()))?;
        Ok(path)
    }

    /// Stage the companion audio track as `audio.{extension}`.
    pub fn stage_audio(&self, data: &[u8], extension: &str) -> CaptureResult<PathBuf> {
        let ext = extension.trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CaptureError::validation(format!(
                "invalid audio extension '{extension}'"
            )));
        }
        let path = self.dir.path().join(format!("audio.{ext}"));
        std::fs::write(&path, data)
            .with_context(|| format!("failed to stage audio '{}'", path.display()))?;
        Ok(path)
    }

    /// Where the encoder writes its container.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILE)
    }

    /// Remove the staging directory.
    pub fn close(self) -> CaptureResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove staging directory '{}'", path.display()))?;
        Ok(())
    }

    fn spill_path(&self, index: FrameIndex) -> PathBuf {
        self.spill.join(format!("frame_{}.bin", index.0))
    }
}

impl FrameSpill for StagingArea {
    fn spill(&mut self, index: FrameIndex, payload: &[u8]) -> CaptureResult<()> {
        let path = self.spill_path(index);
        std::fs::write(&path, payload)
            .with_context(|| format!("failed to spill frame {} to '{}'", index.0, path.display()))?;
        Ok(())
    }

    fn restore(&self, index: FrameIndex) -> CaptureResult<Vec<u8>> {
        let path = self.spill_path(index);
        let bytes = std::fs::read(&path).with_context(|| {
            format!("failed to restore spilled frame {} from '{}'", index.0, path.display())
        })?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/staging.rs"]
mod tests;
