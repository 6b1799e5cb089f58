//! Execution context shared by all stages in a pipeline run.
//!
//! Everything that used to be process-wide mutable state (the temp-file
//! list, the remote store configuration) is owned by one [`PipelineContext`]
//! so concurrent or test-isolated runs never observe each other.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use vivacast_av::{AssetStore, ToolRegistry};
use vivacast_core::config::Config;
use vivacast_core::{Error, Result, RunId};

use crate::artifacts::ArtifactRegistry;

/// Sender for reporting progress from within stages.
///
/// Wraps a callback that receives a progress percentage (0.0 -- 100.0) and a
/// human-readable step description.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, progress: f32, step: &str) {
        (self.callback)(progress, step);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Context passed to every stage of a run.
pub struct PipelineContext {
    /// Identifier of this run, tagged on logs and the work directory.
    pub run_id: RunId,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Discovered external tools.
    pub tools: Arc<ToolRegistry>,
    /// Remote asset store collaborator.
    pub store: Arc<dyn AssetStore>,
    /// Directory for intermediate files.
    pub work_dir: PathBuf,
    /// Directory where the manifest, run metadata, and relay members land.
    pub output_dir: PathBuf,
    /// Registry of every file produced as a side effect.
    pub artifacts: Arc<ArtifactRegistry>,
    /// Token checked between stages; when cancelled the run aborts early.
    pub cancellation: CancellationToken,
    /// Channel for reporting progress to the caller.
    pub progress: Arc<ProgressSender>,
}

impl PipelineContext {
    /// Create a new context with the minimum required fields.
    pub fn new(
        config: Config,
        tools: ToolRegistry,
        store: Arc<dyn AssetStore>,
        work_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            config: Arc::new(config),
            tools: Arc::new(tools),
            store,
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
            artifacts: Arc::new(ArtifactRegistry::new()),
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Fail the given stage if the run has been cancelled.
    pub fn check_cancelled(&self, stage: &str) -> Result<()> {
        if self.cancellation.is_cancelled() {
            Err(Error::pipeline(stage, "cancelled"))
        } else {
            Ok(())
        }
    }
}
