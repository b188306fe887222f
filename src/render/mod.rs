//! Rendering surfaces and the scratch-memory pool used while capturing from them.

/// Pooled pixel buffers and drawing surfaces.
pub mod pool;
/// `vello_cpu` reference surface.
pub mod procedural;
/// Surface contract and render-state toggles.
pub mod surface;
