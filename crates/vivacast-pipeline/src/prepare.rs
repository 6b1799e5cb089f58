//! Broadcast preparation: fetch, normalize, split, overlay, plan, convert.
//!
//! Runs every stage up to (but not including) the relay, leaving a concat
//! manifest, per-member TS files, and a metadata sidecar in the output
//! directory. Every intermediate is registered with the artifact registry as
//! it is created; the caller owns the single cleanup point.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use vivacast_av::actions;
use vivacast_core::config::RunSpec;
use vivacast_core::{Error, Result};

use crate::context::PipelineContext;
use crate::overlay;
use crate::plan::{self, Role, RunMetadata, SequencePlan};
use crate::split::{self, SourceVideo};

/// Name of the concat manifest in the output directory.
pub const MANIFEST_FILE: &str = "sequence.txt";
/// Name of the run metadata sidecar in the output directory.
pub const METADATA_FILE: &str = "session.json";

/// Everything the relay stage needs, as left on disk by [`prepare`].
#[derive(Debug)]
pub struct PreparedRun {
    pub plan: SequencePlan,
    pub manifest: PathBuf,
    pub metadata: PathBuf,
}

/// Run the preparation pipeline for `spec`.
pub async fn prepare(ctx: &PipelineContext, spec: &RunSpec) -> Result<PreparedRun> {
    std::fs::create_dir_all(&ctx.work_dir)?;
    std::fs::create_dir_all(&ctx.output_dir)?;

    ctx.check_cancelled("fetch")?;
    ctx.progress.send(5.0, "fetching assets");

    let main_video = fetch_video(ctx, &spec.main_video, "main").await?;
    let logo = fetch_image(ctx, &spec.logo, "logo").await?;
    let footer = fetch_image(ctx, &spec.footer, "footer").await?;

    let opening = fetch_optional_video(ctx, spec.opening.as_deref(), "opening").await?;
    let promo = fetch_optional_video(ctx, spec.promo.as_deref(), "promo").await?;
    let closing = fetch_optional_video(ctx, spec.closing.as_deref(), "closing").await?;

    let mut extras = Vec::with_capacity(spec.extras.len());
    for (index, remote_id) in spec.extras.iter().enumerate() {
        extras.push(fetch_video(ctx, remote_id, &format!("extra{}", index + 1)).await?);
    }

    ctx.check_cancelled("split")?;
    ctx.progress.send(30.0, "splitting main feature");

    let ffprobe = ctx.tools.require("ffprobe")?;
    let duration = vivacast_av::probe_duration(&ffprobe, &main_video).await?;
    let source = SourceVideo {
        path: main_video,
        duration,
    };
    let segments = split::split(ctx, &source, &[duration / 2.0]).await?;

    ctx.check_cancelled("overlay")?;
    ctx.progress.send(50.0, "compositing overlays");

    let mut overlaid = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let output = ctx.work_dir.join(format!("part{}_overlaid.mp4", index + 1));
        overlaid.push(overlay::apply(ctx, segment, &logo, &footer, &output).await?);
    }

    ctx.check_cancelled("plan")?;
    ctx.progress.send(70.0, "planning sequence");

    // TS conversion happens before planning so the exists-on-disk filter and
    // the probed durations both see the files the relay will actually play.
    let mut candidates: Vec<(Role, PathBuf)> = vec![(
        Role::PartOne,
        to_ts(ctx, &overlaid[0], "part1").await?,
    )];
    if let Some(ref opening) = opening {
        candidates.push((Role::Opening, to_ts(ctx, opening, "opening").await?));
    }
    if let Some(ref promo) = promo {
        candidates.push((Role::Promo, to_ts(ctx, promo, "promo").await?));
    }
    for (index, extra) in extras.iter().enumerate() {
        let ts = to_ts(ctx, extra, &format!("extra{}", index + 1)).await?;
        candidates.push((Role::Extra(index), ts));
    }
    if opening.is_some() {
        // Same TS file, played twice; conversion already happened above.
        candidates.push((Role::OpeningRepeat, ctx.output_dir.join("opening.ts")));
    }
    candidates.push((Role::PartTwo, to_ts(ctx, &overlaid[1], "part2").await?));
    if let Some(ref closing) = closing {
        candidates.push((Role::Closing, to_ts(ctx, closing, "closing").await?));
    }

    let plan = plan::plan(&ffprobe, &candidates).await?;

    ctx.progress.send(90.0, "writing manifest");

    let manifest = ctx.output_dir.join(MANIFEST_FILE);
    let metadata_path = ctx.output_dir.join(METADATA_FILE);

    plan::write_manifest(&plan.paths(), &manifest)?;
    ctx.artifacts.register_retained(&manifest);

    let metadata = RunMetadata::new(ctx.run_id, &spec.id, &spec.stream_url, plan.total_duration);
    metadata.write(&metadata_path)?;
    ctx.artifacts.register_retained(&metadata_path);

    // Plan members outlive preparation; exempt them and record the manifest
    // set for the inverse-selection cleanup strategy.
    let member_set: HashSet<PathBuf> = plan.paths().into_iter().collect();
    for path in &member_set {
        ctx.artifacts.exempt(path);
    }
    ctx.artifacts.mark_manifest(
        member_set
            .into_iter()
            .chain([manifest.clone(), metadata_path.clone()]),
    );

    ctx.progress.send(100.0, "prepared");
    tracing::info!(
        "Prepared run {}: {} members, {:.1}s total",
        ctx.run_id,
        plan.members.len(),
        plan.total_duration
    );

    Ok(PreparedRun {
        plan,
        manifest,
        metadata: metadata_path,
    })
}

/// Fetch a remote video and normalize it to the common encode settings.
///
/// Fetches into a staging name, re-encodes into the final name, and leaves
/// both registered; the staging file is collected at cleanup.
async fn fetch_video(ctx: &PipelineContext, remote_id: &str, name: &str) -> Result<PathBuf> {
    let raw = ctx.work_dir.join(format!("{name}_raw.mp4"));
    let normalized = ctx.work_dir.join(format!("{name}.mp4"));
    ctx.artifacts.register(&raw);
    ctx.artifacts.register(&normalized);

    ctx.store.fetch(remote_id, &raw).await?;

    let ffmpeg = ctx.tools.require("ffmpeg")?;
    actions::reencode(&ffmpeg, &raw, &normalized, &ctx.config.encode).await?;
    Ok(normalized)
}

async fn fetch_optional_video(
    ctx: &PipelineContext,
    remote_id: Option<&str>,
    name: &str,
) -> Result<Option<PathBuf>> {
    match remote_id {
        Some(id) => Ok(Some(fetch_video(ctx, id, name).await?)),
        None => {
            tracing::info!("No {name} clip in this run");
            Ok(None)
        }
    }
}

/// Fetch a static image as-is, preserving its remote extension.
async fn fetch_image(ctx: &PipelineContext, remote_id: &str, name: &str) -> Result<PathBuf> {
    let extension = Path::new(remote_id)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");
    let dest = ctx.work_dir.join(format!("{name}.{extension}"));
    ctx.artifacts.register(&dest);
    ctx.store.fetch(remote_id, &dest).await?;
    Ok(dest)
}

/// Convert one clip to MPEG-TS in the output directory.
async fn to_ts(ctx: &PipelineContext, input: &Path, name: &str) -> Result<PathBuf> {
    let output = ctx.output_dir.join(format!("{name}.ts"));
    ctx.artifacts.register(&output);
    let ffmpeg = ctx.tools.require("ffmpeg")?;
    actions::to_mpegts(&ffmpeg, input, &output, &ctx.config.encode).await?;
    Ok(output)
}

/// Load the prepared manifest and metadata back for the relay stage,
/// verifying every member still exists.
pub fn load_prepared(output_dir: &Path) -> Result<(RunMetadata, PathBuf, Vec<PathBuf>)> {
    let manifest = output_dir.join(MANIFEST_FILE);
    let metadata = RunMetadata::load(&output_dir.join(METADATA_FILE))?;

    if metadata.stream_url.is_empty() {
        return Err(Error::Validation(
            "prepared run has an empty stream_url".into(),
        ));
    }

    let members = plan::read_manifest(&manifest)?;
    if members.is_empty() {
        return Err(Error::Validation(format!(
            "manifest {} lists no members",
            manifest.display()
        )));
    }
    for member in &members {
        if !member.exists() {
            return Err(Error::missing_input(member));
        }
    }

    Ok((metadata, manifest, members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::write_manifest;
    use vivacast_core::RunId;

    fn write_metadata(dir: &Path, stream_url: &str) {
        RunMetadata::new(RunId::new(), "broadcast-1", stream_url, 100.0)
            .write(&dir.join(METADATA_FILE))
            .unwrap();
    }

    #[test]
    fn load_prepared_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let member = dir.path().join("part1.ts");
        std::fs::write(&member, b"ts").unwrap();
        write_manifest(&[member.clone()], &dir.path().join(MANIFEST_FILE)).unwrap();
        write_metadata(dir.path(), "rtmp://example/live/key");

        let (metadata, manifest, members) = load_prepared(dir.path()).unwrap();
        assert_eq!(metadata.stream_url, "rtmp://example/live/key");
        assert_eq!(manifest, dir.path().join(MANIFEST_FILE));
        assert_eq!(members, vec![member]);
    }

    #[test]
    fn load_prepared_rejects_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            &[dir.path().join("gone.ts")],
            &dir.path().join(MANIFEST_FILE),
        )
        .unwrap();
        write_metadata(dir.path(), "rtmp://example/live/key");

        let err = load_prepared(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn load_prepared_requires_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_prepared(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn load_prepared_rejects_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&[], &dir.path().join(MANIFEST_FILE)).unwrap();
        write_metadata(dir.path(), "rtmp://example/live/key");

        let err = load_prepared(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
