//! Normalization re-encode.
//!
//! Every fetched video is brought to a common resolution, frame rate, and
//! codec pair before assembly so the concat-based relay never switches
//! stream parameters mid-broadcast.

use std::path::Path;

use vivacast_core::config::EncodeConfig;
use vivacast_core::Result;

use crate::command::ToolCommand;

/// Re-encode `input` into `output` using the normalization settings.
pub async fn reencode(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    encode: &EncodeConfig,
) -> Result<()> {
    tracing::info!("Re-encoding {} -> {}", input.display(), output.display());

    ToolCommand::new(ffmpeg.to_path_buf())
        .arg("-y")
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-vf")
        .arg(format!(
            "scale={}:{},fps={}",
            encode.width, encode.height, encode.fps
        ))
        .arg("-r")
        .arg(encode.fps.to_string())
        .args(["-c:v", "libx264"])
        .arg("-preset")
        .arg(&encode.video_preset)
        .arg("-crf")
        .arg(encode.video_crf.to_string())
        .args(["-acodec", "aac"])
        .arg("-b:a")
        .arg(&encode.audio_bitrate)
        .arg("-ar")
        .arg(encode.audio_rate.to_string())
        .arg("-ac")
        .arg(encode.audio_channels.to_string())
        .arg(output.to_string_lossy())
        .execute()
        .await?;

    Ok(())
}
