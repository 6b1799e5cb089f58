//! FFmpeg operations, one file per external engine invocation.

mod composite;
mod extract;
mod mpegts;
mod reencode;

pub use composite::composite;
pub use extract::extract;
pub use mpegts::to_mpegts;
pub use reencode::reencode;
