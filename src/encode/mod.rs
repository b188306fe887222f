//! Encoder boundary and on-disk staging.

/// Encoder contract, jobs and the in-memory encoder.
pub mod encoder;
/// System `ffmpeg` encoder.
pub mod ffmpeg;
/// Per-session scratch directory.
pub mod staging;
