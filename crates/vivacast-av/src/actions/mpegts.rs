//! Per-member MPEG-TS conversion for the relay stage.

use std::path::Path;

use vivacast_core::config::EncodeConfig;
use vivacast_core::Result;

use crate::command::ToolCommand;

/// Convert one plan member into an MPEG transport stream file.
///
/// Annex-B conversion (`h264_mp4toannexb`) makes the members safe to
/// concatenate byte-wise by the relay's concat demuxer.
pub async fn to_mpegts(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    encode: &EncodeConfig,
) -> Result<()> {
    tracing::info!("Generating TS: {} -> {}", input.display(), output.display());

    ToolCommand::new(ffmpeg.to_path_buf())
        .arg("-y")
        .arg("-i")
        .arg(input.to_string_lossy())
        .args(["-c:v", "libx264"])
        .arg("-preset")
        .arg(&encode.video_preset)
        .arg("-crf")
        .arg(encode.video_crf.to_string())
        .args(["-c:a", "aac"])
        .arg("-b:a")
        .arg(&encode.audio_bitrate)
        .arg("-ar")
        .arg(encode.audio_rate.to_string())
        .arg("-ac")
        .arg(encode.audio_channels.to_string())
        .args(["-bsf:v", "h264_mp4toannexb", "-f", "mpegts"])
        .arg(output.to_string_lossy())
        .execute()
        .await?;

    Ok(())
}
