//! Frame capture: extraction, batching, transport selection and the export session.

/// Cooperative cancellation.
pub mod cancel;
/// Render-and-read-back of single frames.
pub mod extractor;
/// Phases, status events and progress mapping.
pub mod progress;
/// Batched concurrent extraction.
pub mod scheduler;
/// Export session state machine.
pub mod session;
/// Compressed-image encoding and resampling.
pub mod transcode;
/// Raw versus compressed staging for the encoder.
pub mod transport;
