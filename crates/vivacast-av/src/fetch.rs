//! Remote asset store collaborator.
//!
//! The pipeline needs `fetch(remote_id) -> local path` and nothing else about
//! how bytes move; the production implementation shells out to rclone, and
//! tests swap in [`LocalStore`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use vivacast_core::{Error, Result};

use crate::command::ToolCommand;

/// Source of remote broadcast assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fetch `remote_id` into the exact local path `dest`.
    ///
    /// Failure is pipeline-fatal; implementations must not leave a partial
    /// file at `dest` on error.
    async fn fetch(&self, remote_id: &str, dest: &Path) -> Result<()>;
}

/// Asset store backed by an rclone remote.
pub struct RcloneStore {
    rclone: PathBuf,
    remote: String,
    config: Option<PathBuf>,
}

impl RcloneStore {
    /// Create a store for the given rclone binary and remote name.
    pub fn new(rclone: PathBuf, remote: impl Into<String>, config: Option<PathBuf>) -> Self {
        Self {
            rclone,
            remote: remote.into(),
            config,
        }
    }
}

#[async_trait]
impl AssetStore for RcloneStore {
    async fn fetch(&self, remote_id: &str, dest: &Path) -> Result<()> {
        let dest_dir = dest
            .parent()
            .ok_or_else(|| Error::Validation(format!("fetch destination {} has no parent", dest.display())))?;

        tracing::info!("Fetching {}:{remote_id}", self.remote);

        let mut cmd = ToolCommand::new(self.rclone.clone());
        cmd.arg("copy")
            .arg(format!("{}:{}", self.remote, remote_id))
            .arg(dest_dir.to_string_lossy());
        if let Some(ref config) = self.config {
            cmd.arg("--config").arg(config.to_string_lossy());
        }
        cmd.execute().await?;

        // rclone copy lands the file under its remote basename; rename it
        // into the caller's path.
        let basename = Path::new(remote_id)
            .file_name()
            .ok_or_else(|| Error::Validation(format!("remote id '{remote_id}' has no basename")))?;
        let downloaded = dest_dir.join(basename);

        if !downloaded.exists() {
            return Err(Error::Tool {
                tool: "rclone".to_string(),
                message: format!("copy succeeded but {} is missing", downloaded.display()),
            });
        }

        if downloaded != dest {
            std::fs::rename(&downloaded, dest)?;
        }

        tracing::info!("Fetched {remote_id} -> {}", dest.display());
        Ok(())
    }
}

/// Asset store reading from a local directory. Used by tests and useful for
/// dry runs against pre-downloaded material.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    async fn fetch(&self, remote_id: &str, dest: &Path) -> Result<()> {
        let source = self.root.join(remote_id);
        if !source.exists() {
            return Err(Error::missing_input(source));
        }
        std::fs::copy(&source, dest)?;
        Ok(())
    }
}
