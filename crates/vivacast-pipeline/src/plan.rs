//! Sequence planner and run manifest.
//!
//! The broadcast is an ordered template of roles: part one of the feature,
//! an opening clip, a promo, any extras, the opening again, part two, and a
//! closing clip. Optional roles whose backing file never materialized are
//! skipped silently; the relative order of the survivors always matches the
//! template. The planner probes every surviving member and emits the concat
//! manifest plus a JSON metadata sidecar for the relay stage.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use vivacast_av::probe_duration;
use vivacast_core::{Error, Result, RunId};

/// Position of a clip within the broadcast template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    PartOne,
    Opening,
    Promo,
    Extra(usize),
    OpeningRepeat,
    PartTwo,
    Closing,
}

impl Role {
    /// Whether a plan may omit this role without failing.
    pub fn optional(&self) -> bool {
        !matches!(self, Role::PartOne | Role::PartTwo)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::PartOne => write!(f, "part-one"),
            Role::Opening => write!(f, "opening"),
            Role::Promo => write!(f, "promo"),
            Role::Extra(n) => write!(f, "extra-{}", n + 1),
            Role::OpeningRepeat => write!(f, "opening-repeat"),
            Role::PartTwo => write!(f, "part-two"),
            Role::Closing => write!(f, "closing"),
        }
    }
}

/// One clip slotted into the final broadcast.
#[derive(Debug, Clone)]
pub struct PlanMember {
    pub role: Role,
    pub path: PathBuf,
    /// Probed duration in seconds.
    pub duration: f64,
}

/// The immutable ordered broadcast plan.
#[derive(Debug, Clone)]
pub struct SequencePlan {
    pub members: Vec<PlanMember>,
    /// Sum of member durations, seconds.
    pub total_duration: f64,
}

impl SequencePlan {
    /// Paths of the members, in broadcast order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }
}

/// Filter the role template down to the clips that exist on disk.
///
/// Mandatory roles that are missing are an error; optional roles are
/// dropped. Relative order is the template order, unconditionally.
pub fn select_present(candidates: &[(Role, PathBuf)]) -> Result<Vec<(Role, PathBuf)>> {
    let mut present = Vec::with_capacity(candidates.len());
    for (role, path) in candidates {
        if path.exists() {
            present.push((*role, path.clone()));
        } else if role.optional() {
            tracing::info!("Skipping absent {role}: {}", path.display());
        } else {
            return Err(Error::missing_input(path));
        }
    }
    Ok(present)
}

/// Probe every present candidate and assemble the plan.
pub async fn plan(ffprobe: &Path, candidates: &[(Role, PathBuf)]) -> Result<SequencePlan> {
    let present = select_present(candidates)?;

    let probes = present
        .iter()
        .map(|(_, path)| probe_duration(ffprobe, path));
    let durations = try_join_all(probes).await?;

    let members: Vec<PlanMember> = present
        .into_iter()
        .zip(durations)
        .map(|((role, path), duration)| PlanMember {
            role,
            path,
            duration,
        })
        .collect();

    let total_duration = members.iter().map(|m| m.duration).sum();

    for member in &members {
        tracing::info!(
            "Plan member {}: {} ({:.2}s)",
            member.role,
            member.path.display(),
            member.duration
        );
    }
    tracing::info!("Planned broadcast: {:.2}s total", total_duration);

    Ok(SequencePlan {
        members,
        total_duration,
    })
}

/// Write the concat-demuxer manifest, one `file '<path>'` line per member.
pub fn write_manifest(paths: &[PathBuf], manifest: &Path) -> Result<()> {
    let mut body = String::new();
    for path in paths {
        body.push_str(&format!("file '{}'\n", path.display()));
    }
    std::fs::write(manifest, body)?;
    Ok(())
}

/// Read a concat manifest back into its member paths.
pub fn read_manifest(manifest: &Path) -> Result<Vec<PathBuf>> {
    if !manifest.exists() {
        return Err(Error::missing_input(manifest));
    }
    let body = std::fs::read_to_string(manifest)?;
    let mut paths = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let inner = line
            .strip_prefix("file '")
            .and_then(|rest| rest.strip_suffix('\''))
            .ok_or_else(|| {
                Error::Validation(format!("malformed manifest line in {}: {line}", manifest.display()))
            })?;
        paths.push(PathBuf::from(inner));
    }
    Ok(paths)
}

/// Metadata handed from the preparation stage to the relay stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub id: RunId,
    /// External broadcast identifier from the run spec.
    pub broadcast_id: String,
    pub stream_url: String,
    /// Planned broadcast length in seconds.
    pub total_duration: f64,
    pub prepared_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn new(
        id: RunId,
        broadcast_id: impl Into<String>,
        stream_url: impl Into<String>,
        total_duration: f64,
    ) -> Self {
        Self {
            id,
            broadcast_id: broadcast_id.into(),
            stream_url: stream_url.into(),
            total_duration,
            prepared_at: Utc::now(),
        }
    }

    /// Persist as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from disk; absence is a [`Error::MissingInput`], since the relay
    /// stage cannot start without a prepared run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::missing_input(path));
        }
        let body = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    fn template(dir: &Path) -> Vec<(Role, PathBuf)> {
        vec![
            (Role::PartOne, dir.join("part1.ts")),
            (Role::Opening, dir.join("opening.ts")),
            (Role::Promo, dir.join("promo.ts")),
            (Role::Extra(0), dir.join("extra1.ts")),
            (Role::OpeningRepeat, dir.join("opening.ts")),
            (Role::PartTwo, dir.join("part2.ts")),
            (Role::Closing, dir.join("closing.ts")),
        ]
    }

    #[test]
    fn absent_optional_roles_are_skipped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        // Roles 2 (opening) and 4 (extra) absent; opening-repeat therefore
        // also absent since it shares the opening file.
        touch(dir.path(), "part1.ts");
        touch(dir.path(), "promo.ts");
        touch(dir.path(), "part2.ts");
        touch(dir.path(), "closing.ts");

        let present = select_present(&template(dir.path())).unwrap();
        let roles: Vec<Role> = present.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            roles,
            vec![Role::PartOne, Role::Promo, Role::PartTwo, Role::Closing]
        );
    }

    #[test]
    fn seven_roles_two_absent_yields_five_in_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "part1.ts");
        touch(dir.path(), "opening.ts");
        touch(dir.path(), "part2.ts");
        touch(dir.path(), "closing.ts");
        // promo and extra1 absent.

        let present = select_present(&template(dir.path())).unwrap();
        let roles: Vec<Role> = present.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            roles,
            vec![
                Role::PartOne,
                Role::Opening,
                Role::OpeningRepeat,
                Role::PartTwo,
                Role::Closing,
            ]
        );
    }

    #[test]
    fn missing_mandatory_role_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "part1.ts");
        // part2 absent.
        let err = select_present(&template(dir.path())).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("sequence.txt");
        let paths = vec![PathBuf::from("/out/part1.ts"), PathBuf::from("/out/opening.ts")];
        write_manifest(&paths, &manifest).unwrap();

        let body = std::fs::read_to_string(&manifest).unwrap();
        assert_eq!(body, "file '/out/part1.ts'\nfile '/out/opening.ts'\n");
        assert_eq!(read_manifest(&manifest).unwrap(), paths);
    }

    #[test]
    fn malformed_manifest_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("sequence.txt");
        std::fs::write(&manifest, "part1.ts\n").unwrap();
        assert!(matches!(
            read_manifest(&manifest),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let meta = RunMetadata::new(
            RunId::new(),
            "feira-2026-08",
            "rtmp://example/live/key",
            1234.5,
        );
        meta.write(&path).unwrap();

        let loaded = RunMetadata::load(&path).unwrap();
        assert_eq!(loaded.id, meta.id);
        assert_eq!(loaded.broadcast_id, "feira-2026-08");
        assert_eq!(loaded.stream_url, meta.stream_url);
        assert_eq!(loaded.total_duration, meta.total_duration);
    }

    #[test]
    fn metadata_absence_is_missing_input() {
        let err = RunMetadata::load(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn role_display_names() {
        assert_eq!(Role::PartOne.to_string(), "part-one");
        assert_eq!(Role::Extra(1).to_string(), "extra-2");
        assert_eq!(Role::OpeningRepeat.to_string(), "opening-repeat");
    }
}
