//! vivacast-pipeline: broadcast assembly orchestration.
//!
//! Stages: fetch and normalize assets, split the main feature, composite the
//! timed overlay onto both halves, plan the broadcast sequence, convert plan
//! members to MPEG-TS, then relay the manifest to the destination endpoint.
//!
//! The entry points ([`run_prepare`], [`run_relay`], [`run_full`]) all funnel
//! through one finalization scope so artifact cleanup fires on every exit
//! path, success or propagated error alike.

pub mod artifacts;
pub mod context;
pub mod overlay;
pub mod plan;
pub mod prepare;
pub mod relay;
pub mod split;

pub use artifacts::{ArtifactRegistry, CleanupSummary};
pub use context::{PipelineContext, ProgressSender};
pub use plan::{PlanMember, Role, RunMetadata, SequencePlan};
pub use prepare::{PreparedRun, MANIFEST_FILE, METADATA_FILE};
pub use relay::{RelayDriver, RelayState};
pub use split::{Segment, SourceVideo};

use vivacast_core::config::RunSpec;
use vivacast_core::Result;

/// Run the preparation stages, then clean up.
pub async fn run_prepare(ctx: &PipelineContext, spec: &RunSpec) -> Result<PreparedRun> {
    finalize(ctx, prepare::prepare(ctx, spec).await)
}

/// Relay a previously prepared run, then clean up.
///
/// The manifest members are registered as temporaries at relay start so the
/// default strategy removes them once the broadcast is over.
pub async fn run_relay(ctx: &PipelineContext) -> Result<()> {
    finalize(ctx, relay_inner(ctx).await)
}

/// Prepare and relay in one process.
///
/// The prepared members stay exempted through the relay and are then
/// re-registered as temporaries, so a single cleanup at the very end removes
/// everything the run produced.
pub async fn run_full(ctx: &PipelineContext, spec: &RunSpec) -> Result<()> {
    let result = async {
        let prepared = prepare::prepare(ctx, spec).await?;
        drive_relay(
            ctx,
            &prepared.manifest,
            &spec.stream_url,
            prepared.plan.total_duration,
        )
        .await?;
        for path in prepared.plan.paths() {
            ctx.artifacts.register(path);
        }
        ctx.artifacts.register(prepared.manifest);
        ctx.artifacts.register(prepared.metadata);
        Ok(())
    }
    .await;
    finalize(ctx, result)
}

async fn relay_inner(ctx: &PipelineContext) -> Result<()> {
    let (metadata, manifest, members) = prepare::load_prepared(&ctx.output_dir)?;

    for member in &members {
        ctx.artifacts.register(member);
    }
    ctx.artifacts.register(&manifest);
    ctx.artifacts
        .register(ctx.output_dir.join(prepare::METADATA_FILE));

    drive_relay(ctx, &manifest, &metadata.stream_url, metadata.total_duration).await
}

async fn drive_relay(
    ctx: &PipelineContext,
    manifest: &std::path::Path,
    stream_url: &str,
    total_duration: f64,
) -> Result<()> {
    let ffmpeg = ctx.tools.require("ffmpeg")?;
    let mut driver = RelayDriver::new(ffmpeg, ctx.config.relay.clone(), ctx.config.encode.clone());
    driver
        .run(
            manifest,
            stream_url,
            total_duration,
            &ctx.cancellation,
            &ctx.progress,
        )
        .await
}

/// The single cleanup point. Runs regardless of `result`, logs the summary,
/// and passes the original outcome through untouched.
fn finalize<T>(ctx: &PipelineContext, result: Result<T>) -> Result<T> {
    let summary = ctx.artifacts.cleanup_all(ctx.config.cleanup.strategy);
    tracing::info!("Cleanup: {summary}");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vivacast_av::{LocalStore, ToolRegistry};
    use vivacast_core::config::{CleanupStrategy, Config};
    use vivacast_core::Error;

    fn make_ctx(work: &std::path::Path, out: &std::path::Path) -> PipelineContext {
        let config = Config::default();
        let tools = ToolRegistry::discover(&config.tools);
        PipelineContext::new(config, tools, Arc::new(LocalStore::new(work)), work, out)
    }

    #[test]
    fn finalize_preserves_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp.mp4");
        std::fs::write(&temp, b"x").unwrap();

        let ctx = make_ctx(dir.path(), dir.path());
        ctx.artifacts.register(&temp);

        let result: Result<()> = finalize(&ctx, Err(Error::Validation("boom".into())));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!temp.exists());
    }

    #[test]
    fn finalize_preserves_success() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path(), dir.path());
        assert_eq!(finalize(&ctx, Ok(7)).unwrap(), 7);
    }

    #[tokio::test]
    async fn run_relay_without_prepared_output_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path(), dir.path());
        let err = run_relay(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
        // Cleanup already ran; a second manual call is a no-op.
        assert_eq!(
            ctx.artifacts.cleanup_all(CleanupStrategy::TemporariesOnly),
            CleanupSummary::default()
        );
    }
}
