//! Pipeline integration tests
//!
//! Exercises the planner, artifact lifecycle, and relay driver together
//! without any external tools: members are plain files and the "transport"
//! is a shell builtin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use vivacast_av::{LocalStore, ToolRegistry};
use vivacast_core::config::{CleanupStrategy, Config, EncodeConfig, RelayConfig};
use vivacast_core::Error;
use vivacast_pipeline::plan::{read_manifest, select_present, write_manifest, Role, RunMetadata};
use vivacast_pipeline::{PipelineContext, ProgressSender, RelayDriver, RelayState};

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"x").unwrap();
    path
}

fn make_ctx(work: &Path, out: &Path) -> PipelineContext {
    let config = Config::default();
    let tools = ToolRegistry::discover(&config.tools);
    PipelineContext::new(config, tools, Arc::new(LocalStore::new(work)), work, out)
}

#[test]
fn planner_skips_absent_optionals_and_keeps_template_order() {
    let dir = tempdir().unwrap();
    let part1 = touch(dir.path(), "part1.ts");
    let part2 = touch(dir.path(), "part2.ts");
    let closing = touch(dir.path(), "closing.ts");

    let candidates = vec![
        (Role::PartOne, part1.clone()),
        (Role::Opening, dir.path().join("opening.ts")),
        (Role::Promo, dir.path().join("promo.ts")),
        (Role::PartTwo, part2.clone()),
        (Role::Closing, closing.clone()),
    ];

    let present = select_present(&candidates).unwrap();
    let paths: Vec<PathBuf> = present.into_iter().map(|(_, p)| p).collect();
    assert_eq!(paths, vec![part1, part2, closing]);
}

#[test]
fn manifest_and_metadata_survive_a_round_trip() {
    let dir = tempdir().unwrap();
    let members = vec![touch(dir.path(), "a.ts"), touch(dir.path(), "b.ts")];
    let manifest = dir.path().join("sequence.txt");

    write_manifest(&members, &manifest).unwrap();
    assert_eq!(read_manifest(&manifest).unwrap(), members);

    let metadata_path = dir.path().join("session.json");
    let metadata = RunMetadata::new(
        vivacast_core::RunId::new(),
        "evt-42",
        "rtmp://example/live/key",
        512.25,
    );
    metadata.write(&metadata_path).unwrap();
    let loaded = RunMetadata::load(&metadata_path).unwrap();
    assert_eq!(loaded.broadcast_id, "evt-42");
    assert_eq!(loaded.total_duration, 512.25);
}

#[test]
fn cleanup_collects_temporaries_but_not_the_manifest() {
    let work = tempdir().unwrap();
    let out = tempdir().unwrap();
    let ctx = make_ctx(work.path(), out.path());

    let temp = touch(work.path(), "main_raw.mp4");
    let member = touch(out.path(), "part1.ts");
    let manifest = touch(out.path(), "sequence.txt");

    ctx.artifacts.register(&temp);
    ctx.artifacts.register(&member);
    ctx.artifacts.exempt(&member);
    ctx.artifacts.register_retained(&manifest);

    let summary = ctx.artifacts.cleanup_all(CleanupStrategy::TemporariesOnly);
    assert!(!temp.exists());
    assert!(member.exists());
    assert!(manifest.exists());
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.kept, 2);
}

#[test]
fn inverse_cleanup_keeps_only_manifest_members() {
    let out = tempdir().unwrap();
    let ctx = make_ctx(out.path(), out.path());

    let member = touch(out.path(), "part1.ts");
    let stray = touch(out.path(), "part1.mp4");

    ctx.artifacts.register(&member);
    ctx.artifacts.register(&stray);
    ctx.artifacts.mark_manifest([member.clone()]);

    ctx.artifacts.cleanup_all(CleanupStrategy::RetainManifestOnly);
    assert!(member.exists());
    assert!(!stray.exists());
}

#[tokio::test]
async fn relay_driver_forwards_transport_exit_code() {
    let mut driver = RelayDriver::new("false", RelayConfig::default(), EncodeConfig::default());
    let err = driver
        .run(
            Path::new("/dev/null"),
            "rtmp://example/live",
            5.0,
            &CancellationToken::new(),
            &ProgressSender::noop(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Relay { code: 1 }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(driver.state(), RelayState::Failed(1));
}

#[tokio::test]
async fn relay_driver_completes_on_clean_exit() {
    let mut driver = RelayDriver::new("true", RelayConfig::default(), EncodeConfig::default());
    driver
        .run(
            Path::new("/dev/null"),
            "rtmp://example/live",
            5.0,
            &CancellationToken::new(),
            &ProgressSender::noop(),
        )
        .await
        .unwrap();
    assert_eq!(driver.state(), RelayState::Completed);
}

#[tokio::test]
async fn run_relay_cleans_up_even_when_nothing_was_prepared() {
    let dir = tempdir().unwrap();
    let ctx = make_ctx(dir.path(), dir.path());

    let err = vivacast_pipeline::run_relay(&ctx).await.unwrap_err();
    assert!(matches!(err, Error::MissingInput { .. }));
}
