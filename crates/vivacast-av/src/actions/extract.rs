//! Lossless sub-segment extraction.

use std::path::Path;

use vivacast_core::Result;

use crate::command::ToolCommand;
use crate::filter;

/// Cut `[start, start + duration)` out of `input` with a stream copy.
///
/// `duration: None` runs to the end of the input. Stream copy snaps to
/// keyframe boundaries, so the actual cut may differ from the request by up
/// to one GOP; callers that care re-probe the output.
pub async fn extract(
    ffmpeg: &Path,
    input: &Path,
    start: f64,
    duration: Option<f64>,
    output: &Path,
) -> Result<()> {
    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.arg("-y").arg("-i").arg(input.to_string_lossy());
    if start > 0.0 {
        cmd.arg("-ss").arg(filter::num(start));
    }
    if let Some(duration) = duration {
        cmd.arg("-t").arg(filter::num(duration));
    }
    cmd.args(["-c", "copy"]).arg(output.to_string_lossy());

    cmd.execute().await?;
    Ok(())
}
