/// Result alias used across the crate.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Crate error type.
///
/// `TransportAllocation` is recovered inside the write stage and `StateRestore` is only ever
/// logged; every other variant aborts an export session after cleanup has run.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// Invalid configuration or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Neither read path produced pixels for a frame.
    #[error("frame extraction failed at frame {frame_index}: {reason}")]
    FrameExtraction {
        /// Frame that could not be read back.
        frame_index: u64,
        /// Combined cause from the attempted read paths.
        reason: String,
    },

    /// A batch task failed; wraps the underlying cause with its frame index.
    #[error("batch capture failed at frame {frame_index}: {source}")]
    BatchCapture {
        /// Frame whose task failed.
        frame_index: u64,
        /// Underlying failure.
        #[source]
        source: Box<CaptureError>,
    },

    /// An RGBA buffer does not match its declared dimensions.
    #[error("pixel buffer size mismatch: got {actual} bytes, expected {expected} for {width}x{height} rgba")]
    PixelSizeMismatch {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// The contiguous raw-pixel buffer could not be allocated.
    #[error("raw transport allocation of {bytes} bytes failed")]
    TransportAllocation {
        /// Requested allocation size.
        bytes: u64,
    },

    /// External encoder failure.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Render state could not be re-applied.
    #[error("render state restore failed: {0}")]
    StateRestore(String),

    /// Export was cancelled by the caller.
    #[error("export cancelled")]
    Cancelled,

    /// Anything else, usually I/O with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptureError {
    /// Build a [`CaptureError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CaptureError::FrameExtraction`].
    pub fn frame_extraction(frame_index: u64, reason: impl Into<String>) -> Self {
        Self::FrameExtraction {
            frame_index,
            reason: reason.into(),
        }
    }

    /// Wrap `source` as the failure of the batch task for `frame_index`.
    pub fn batch_capture(frame_index: u64, source: CaptureError) -> Self {
        Self::BatchCapture {
            frame_index,
            source: Box::new(source),
        }
    }

    /// Build a [`CaptureError::Encoding`].
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`CaptureError::StateRestore`].
    pub fn state_restore(msg: impl Into<String>) -> Self {
        Self::StateRestore(msg.into())
    }

    /// Check an RGBA buffer length against `width*height*4`.
    pub fn check_rgba_len(buf: &[u8], width: u32, height: u32) -> CaptureResult<()> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if buf.len() != expected {
            return Err(Self::PixelSizeMismatch {
                width,
                height,
                expected,
                actual: buf.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
