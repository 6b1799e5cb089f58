//! Unified error type for the vivacast application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the binary to derive a process exit code via
//! [`Error::exit_code`] and print a single terminal message naming the
//! failing stage.

use std::path::PathBuf;

/// Unified error type covering all failure modes in vivacast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input file is missing before any external engine ran.
    #[error("missing input: {}", path.display())]
    MissingInput {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// Run spec or configuration data failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// An external tool (ffmpeg, ffprobe, rclone) returned an error.
    #[error("tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("probe error: {0}")]
    Probe(String),

    /// A pipeline stage failed.
    #[error("pipeline error [{stage}]: {message}")]
    Pipeline {
        /// The pipeline stage that failed.
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// The relay transport process exited nonzero.
    #[error("relay failed with exit code {code}")]
    Relay {
        /// Exit code reported by the transport process.
        code: i32,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to the process exit code.
    ///
    /// The relay's own nonzero exit code is forwarded when the relay is the
    /// failing stage; every other failure is a plain fatal `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Relay { code } if *code > 0 => *code,
            _ => 1,
        }
    }

    /// Convenience constructor for [`Error::MissingInput`].
    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Error::MissingInput { path: path.into() }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_display() {
        let err = Error::missing_input("/tmp/input.json");
        assert_eq!(err.to_string(), "missing input: /tmp/input.json");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("stream_url is required".into());
        assert_eq!(err.to_string(), "validation error: stream_url is required");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn pipeline_display() {
        let err = Error::pipeline("split", "extraction failed");
        assert_eq!(err.to_string(), "pipeline error [split]: extraction failed");
    }

    #[test]
    fn relay_code_is_forwarded() {
        let err = Error::Relay { code: 69 };
        assert_eq!(err.exit_code(), 69);
    }

    #[test]
    fn relay_signal_exit_maps_to_one() {
        // A signal-terminated child reports no meaningful code; keep it fatal.
        let err = Error::Relay { code: 0 };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
