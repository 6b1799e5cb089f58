//! vivacast-av: external engine plumbing.
//!
//! Everything that shells out lives here: tool discovery, the async command
//! builder, the duration prober, the remote asset store, and the ffmpeg
//! actions (extract, re-encode, composite, MPEG-TS conversion). The
//! compositing filter graph is rendered from typed timing data in
//! [`filter`]; no stage builds filter strings by hand.

pub mod actions;
pub mod command;
pub mod fetch;
pub mod filter;
pub mod probe;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use fetch::{AssetStore, LocalStore, RcloneStore};
pub use filter::{CompositingRequest, FooterLayer};
pub use probe::probe_duration;
pub use tools::{ToolInfo, ToolRegistry};
