//! Duration prober backed by the `ffprobe` CLI.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format` and maps
//! the JSON output to a duration in seconds. The pipeline only ever needs
//! durations, so the full stream listing is not requested.

use std::path::Path;

use serde::Deserialize;

use vivacast_core::{Error, Result};

use crate::command::ToolCommand;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a local media file and return its duration in seconds.
///
/// # Errors
///
/// - [`Error::MissingInput`] if the file does not exist.
/// - [`Error::Tool`] if ffprobe fails to run or exits nonzero.
/// - [`Error::Probe`] if the output carries no parseable duration.
pub async fn probe_duration(ffprobe: &Path, file: &Path) -> Result<f64> {
    if !file.exists() {
        return Err(Error::missing_input(file));
    }

    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(file.to_string_lossy())
        .execute()
        .await?;

    let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let duration = parsed
        .format
        .duration
        .ok_or_else(|| Error::Probe(format!("no duration reported for {}", file.display())))?;

    duration.trim().parse::<f64>().map_err(|e| {
        Error::Probe(format!(
            "unparseable duration '{}' for {}: {e}",
            duration,
            file.display()
        ))
    })
}
