//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools this pipeline drives (ffmpeg, ffprobe, rclone) and provides
//! lookup methods for the rest of the workspace.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use vivacast_core::config::ToolsConfig;
use vivacast_core::{Error, Result};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "rclone"];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`ToolsConfig`] supplies a custom path
    /// **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are omitted from the registry; lookups for them fail at
    /// use time with a tool error.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                "rclone" => tools_config.rclone_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            } else {
                tracing::debug!("Tool not found: {name}");
            }
        }

        Self { tools }
    }

    /// Look up a tool's path, failing if it was not discovered.
    pub fn require(&self, name: &str) -> Result<PathBuf> {
        self.tools.get(name).cloned().ok_or_else(|| Error::Tool {
            tool: name.to_string(),
            message: "not found on PATH and no configured path exists".to_string(),
        })
    }

    /// Whether a tool was discovered.
    pub fn is_available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check all known tools, probing each for its version string.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                let path = self.tools.get(name).cloned();
                let version = path.as_ref().and_then(|p| probe_version(name, p));
                ToolInfo {
                    name: name.to_string(),
                    available: path.is_some(),
                    version,
                    path,
                }
            })
            .collect()
    }
}

/// Run the tool's version flag and keep the first output line.
fn probe_version(name: &str, path: &std::path::Path) -> Option<String> {
    // ffmpeg and ffprobe use a single-dash flag; rclone uses GNU style.
    let flag = if name == "rclone" { "--version" } else { "-version" };

    let output = std::process::Command::new(path).arg(flag).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_fails_require() {
        let registry = ToolRegistry {
            tools: HashMap::new(),
        };
        let err = registry.require("ffmpeg").unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[test]
    fn discover_reports_all_known_tools() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        let infos = registry.check_all();
        assert_eq!(infos.len(), KNOWN_TOOLS.len());
        for info in infos {
            assert!(KNOWN_TOOLS.contains(&info.name.as_str()));
            assert_eq!(info.available, info.path.is_some());
        }
    }

    #[test]
    fn bad_custom_path_falls_back_to_path_lookup() {
        let config = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/bin/ffmpeg")),
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::discover(&config);
        // Either found on PATH or absent entirely; it must never resolve to
        // the bogus configured path.
        if let Ok(path) = registry.require("ffmpeg") {
            assert_ne!(path, PathBuf::from("/nonexistent/bin/ffmpeg"));
        }
    }
}
