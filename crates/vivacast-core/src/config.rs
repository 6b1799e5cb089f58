//! Application configuration and run spec types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for tools, overlay, encode, relay, split, and cleanup. Every
//! section defaults sensibly so a completely empty `{}` file is valid.
//!
//! The [`RunSpec`] is a separate per-broadcast input file (remote asset ids
//! plus the destination URL) and, unlike the config, is required and
//! validated strictly: a broadcast without a stream URL is a fatal input
//! error before any external engine runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::timing::{AnimationCurve, EdgePolicy, OverlayWindow};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub overlay: OverlayConfig,
    pub encode: EncodeConfig,
    pub relay: RelayConfig,
    pub split: SplitConfig,
    pub cleanup: CleanupConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.overlay.window().validate() {
            warnings.push(format!("overlay: {e}"));
        }
        if self.overlay.footer_height_fraction <= 0.0 || self.overlay.footer_height_fraction > 1.0 {
            warnings.push(format!(
                "overlay.footer_height_fraction {} is outside (0, 1]",
                self.overlay.footer_height_fraction
            ));
        }
        if self.encode.fps == 0 {
            warnings.push("encode.fps is 0".into());
        }
        if self.encode.width == 0 || self.encode.height == 0 {
            warnings.push("encode resolution has a zero dimension".into());
        }
        if self.relay.gop == 0 {
            warnings.push("relay.gop is 0; keyframe interval will be encoder default".into());
        }
        if self.tools.rclone_remote.is_empty() {
            warnings.push("tools.rclone_remote is empty; fetches will fail".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// External tool locations and the remote store they talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Override path to ffmpeg (otherwise found on PATH).
    pub ffmpeg_path: Option<PathBuf>,
    /// Override path to ffprobe (otherwise found on PATH).
    pub ffprobe_path: Option<PathBuf>,
    /// Override path to rclone (otherwise found on PATH).
    pub rclone_path: Option<PathBuf>,
    /// Name of the rclone remote holding broadcast assets.
    pub rclone_remote: String,
    /// Explicit rclone config file (`--config`); rclone's own default
    /// location is used when unset.
    pub rclone_config: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            rclone_path: None,
            rclone_remote: "drive".to_string(),
            rclone_config: None,
        }
    }
}

/// Overlay window, animation, and layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Footer visible from this second of the original source.
    pub window_start: f64,
    /// Footer gone again at this second of the original source.
    pub window_end: f64,
    /// Entry animation duration in seconds.
    pub entry: f64,
    /// Exit animation duration in seconds.
    pub exit: f64,
    /// Behavior when the window's true exit falls beyond a segment.
    pub edge_policy: EdgePolicy,
    /// Animation curve for the footer entry/exit.
    pub curve: AnimationCurve,
    /// Logo height in pixels (width follows aspect ratio).
    pub logo_height: u32,
    /// Footer full height as a fraction of the footer image height.
    pub footer_height_fraction: f64,
    /// Minimal footer footprint width in pixels during staged animation.
    pub footer_min_width: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            window_start: 240.0,
            window_end: 300.0,
            entry: 2.0,
            exit: 2.0,
            edge_policy: EdgePolicy::default(),
            curve: AnimationCurve::default(),
            logo_height: 120,
            footer_height_fraction: 0.5,
            footer_min_width: 10.0,
        }
    }
}

impl OverlayConfig {
    /// The configured window as the compiler's input type.
    pub fn window(&self) -> OverlayWindow {
        OverlayWindow {
            start_abs: self.window_start,
            end_abs: self.window_end,
            entry: self.entry,
            exit: self.exit,
        }
    }
}

/// Normalization/composite encoding settings.
///
/// Delivery codec choices are configuration, not behavior; these defaults
/// reproduce the deployment this tool replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_preset: String,
    pub video_crf: u32,
    pub audio_bitrate: String,
    pub audio_rate: u32,
    pub audio_channels: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            video_preset: "veryfast".to_string(),
            video_crf: 23,
            audio_bitrate: "192k".to_string(),
            audio_rate: 44100,
            audio_channels: 2,
        }
    }
}

/// Relay transport encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub maxrate: String,
    pub bufsize: String,
    /// Keyframe interval in frames.
    pub gop: u32,
    pub audio_bitrate: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            maxrate: "3000k".to_string(),
            bufsize: "6000k".to_string(),
            gop: 50,
            audio_bitrate: "160k".to_string(),
        }
    }
}

/// Segment splitter policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Re-probe each cut after extraction. Lossless cuts snap to keyframe
    /// boundaries, so trusting the requested duration can drift by up to one
    /// GOP and shift every downstream overlay phase.
    pub reprobe_after_cut: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            reprobe_after_cut: true,
        }
    }
}

/// Which artifacts to delete at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStrategy {
    /// Delete everything registered as temporary; exempted artifacts stay.
    #[default]
    TemporariesOnly,
    /// Inverse selection: delete every registered artifact that the final
    /// manifest does not reference.
    RetainManifestOnly,
}

/// Cleanup configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub strategy: CleanupStrategy,
}

// ---------------------------------------------------------------------------
// Run spec
// ---------------------------------------------------------------------------

/// Per-broadcast input: remote asset ids and the destination URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    /// External broadcast identifier, recorded in the run metadata.
    pub id: String,
    /// Destination streaming endpoint.
    pub stream_url: String,
    /// Remote id of the main feature video (gets split and overlaid).
    pub main_video: String,
    /// Remote id of the logo image.
    pub logo: String,
    /// Remote id of the footer image.
    pub footer: String,
    /// Remote id of the opening clip, played after part one and again
    /// before part two.
    #[serde(default)]
    pub opening: Option<String>,
    /// Remote id of the promo clip.
    #[serde(default)]
    pub promo: Option<String>,
    /// Remote id of the closing clip.
    #[serde(default)]
    pub closing: Option<String>,
    /// Remote ids of extra clips, in playback order.
    #[serde(default)]
    pub extras: Vec<String>,
}

impl RunSpec {
    /// Load and validate a run spec file. Missing file or missing required
    /// fields are fatal input errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::missing_input(path)
            } else {
                Error::from(e)
            }
        })?;
        let spec: RunSpec = serde_json::from_str(&contents)
            .map_err(|e| Error::Validation(format!("run spec parse error: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject specs that cannot possibly produce a broadcast.
    pub fn validate(&self) -> Result<()> {
        if self.stream_url.is_empty() {
            return Err(Error::Validation("stream_url is required".into()));
        }
        if self.main_video.is_empty() {
            return Err(Error::Validation("main_video is required".into()));
        }
        if self.logo.is_empty() || self.footer.is_empty() {
            return Err(Error::Validation(
                "logo and footer image ids are required".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_valid() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.overlay.window_start, 240.0);
        assert_eq!(config.overlay.window_end, 300.0);
        assert_eq!(config.encode.width, 1280);
        assert_eq!(config.relay.gop, 50);
        assert!(config.split.reprobe_after_cut);
        assert_eq!(config.cleanup.strategy, CleanupStrategy::TemporariesOnly);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_config_overrides() {
        let config = Config::from_json(
            r#"{"overlay": {"window_start": 60, "window_end": 90, "edge_policy": "instant_cut"}}"#,
        )
        .unwrap();
        assert_eq!(config.overlay.window_start, 60.0);
        assert_eq!(config.overlay.edge_policy, EdgePolicy::InstantCut);
        // Untouched sections keep defaults.
        assert_eq!(config.encode.fps, 30);
    }

    #[test]
    fn load_missing_file_defaults() {
        let config = Config::load_or_default(Some(Path::new("/nonexistent/vivacast.json")));
        assert_eq!(config.encode.video_crf, 23);
    }

    #[test]
    fn inverted_window_warns() {
        let config =
            Config::from_json(r#"{"overlay": {"window_start": 300, "window_end": 240}}"#).unwrap();
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn run_spec_requires_stream_url() {
        let spec = RunSpec {
            id: "b-1".into(),
            stream_url: String::new(),
            main_video: "main.mp4".into(),
            logo: "logo.png".into(),
            footer: "footer.png".into(),
            opening: None,
            promo: None,
            closing: None,
            extras: vec![],
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn run_spec_load_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id": "b-2", "stream_url": "rtmp://example/live",
                "main_video": "shows/main.mp4", "logo": "brand/logo.png",
                "footer": "brand/footer.png", "extras": ["e1.mp4", "e2.mp4"]}}"#
        )
        .unwrap();
        let spec = RunSpec::load(file.path()).unwrap();
        assert_eq!(spec.id, "b-2");
        assert_eq!(spec.extras.len(), 2);
        assert!(spec.opening.is_none());
    }

    #[test]
    fn run_spec_missing_file_is_input_error() {
        let err = RunSpec::load(Path::new("/nonexistent/input.json")).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }
}
