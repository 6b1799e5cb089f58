//! vivacast-core: shared types, IDs, errors, configuration, and the overlay
//! timing compiler.
//!
//! This crate is the foundational dependency for the other vivacast crates.
//! It deliberately contains no I/O beyond config file loading: the timing
//! compiler in [`timing`] is pure math so it can be tested exhaustively
//! without touching ffmpeg.

pub mod config;
pub mod error;
pub mod ids;
pub mod timing;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::RunId;
pub use timing::{AnimationCurve, CompiledTiming, EdgePolicy, OverlayWindow, Phase, PhaseKind, SegmentSpan};
