//! Overlay compositing via the external engine.

use std::path::Path;

use vivacast_core::config::EncodeConfig;
use vivacast_core::Result;

use crate::command::ToolCommand;
use crate::filter::CompositingRequest;

/// Render a compositing request into `output`.
///
/// Inputs are ordered video, logo, then footer (when the request carries an
/// active footer layer); the filter graph is generated from the request's
/// compiled timing, never assembled by callers.
pub async fn composite(
    ffmpeg: &Path,
    request: &CompositingRequest,
    output: &Path,
    encode: &EncodeConfig,
) -> Result<()> {
    tracing::info!(
        "Compositing {} (footer: {})",
        request.video.display(),
        request.has_footer()
    );

    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.arg("-y")
        .arg("-i")
        .arg(request.video.to_string_lossy())
        .arg("-i")
        .arg(request.logo.to_string_lossy());
    if let Some(footer) = request.footer.as_ref().filter(|f| f.timing.visible) {
        cmd.arg("-i").arg(footer.image.to_string_lossy());
    }

    cmd.arg("-filter_complex")
        .arg(request.filter_graph())
        .args(["-map", "[outv]", "-map", "0:a?"])
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
        .arg("-r")
        .arg(encode.fps.to_string())
        .arg(output.to_string_lossy());

    cmd.execute().await?;
    Ok(())
}
