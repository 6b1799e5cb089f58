//! Artifact lifecycle registry.
//!
//! Every file created as a pipeline side effect is registered here at
//! creation time, before any operation that could fail. The registry is the
//! sole authority for deleting temporaries and is drained exactly once per
//! run from a single finalization point, on every exit path.
//!
//! Deletion is strictly best-effort: a file that refuses to die is logged
//! and counted, never escalated, so cleanup can never flip a successful run
//! into a failed one.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use vivacast_core::config::CleanupStrategy;

/// Lifecycle tag for a registered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactKind {
    Temporary,
    Retained,
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    kind: ArtifactKind,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Files deleted.
    pub removed: usize,
    /// Files that could not be deleted.
    pub failed: usize,
    /// Registered files deliberately left on disk.
    pub kept: usize,
}

impl fmt::Display for CleanupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} removed, {} kept, {} failed",
            self.removed, self.kept, self.failed
        )
    }
}

/// Registry of every file the pipeline produced.
///
/// Registrations are append-only during the run; [`cleanup_all`] consumes
/// the set logically (a second call is a logged no-op).
///
/// [`cleanup_all`]: ArtifactRegistry::cleanup_all
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    entries: Mutex<Vec<Entry>>,
    /// Paths referenced by the final manifest, for the inverse-selection
    /// cleanup strategy.
    manifest: Mutex<HashSet<PathBuf>>,
    cleaned: AtomicBool,
}

impl ArtifactRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a temporary artifact.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!("Registered temporary artifact: {}", path.display());
        self.entries.lock().push(Entry {
            path,
            kind: ArtifactKind::Temporary,
        });
    }

    /// Register an artifact that should survive cleanup.
    pub fn register_retained(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!("Registered retained artifact: {}", path.display());
        self.entries.lock().push(Entry {
            path,
            kind: ArtifactKind::Retained,
        });
    }

    /// Move every registration of `path` from temporary to retained.
    pub fn exempt(&self, path: &Path) {
        let mut entries = self.entries.lock();
        for entry in entries.iter_mut().filter(|e| e.path == path) {
            entry.kind = ArtifactKind::Retained;
        }
    }

    /// Record the set of paths the final manifest references.
    pub fn mark_manifest(&self, paths: impl IntoIterator<Item = PathBuf>) {
        self.manifest.lock().extend(paths);
    }

    /// Number of registered artifacts (registrations, not unique paths).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Delete artifacts according to `strategy` and return a summary.
    ///
    /// Invoked from exactly one finalization point per run; subsequent calls
    /// do nothing. Files already gone from disk are not counted at all,
    /// matching the append-only model where a later stage may have replaced
    /// an earlier temp in place.
    ///
    /// When a path was registered more than once, the most recent
    /// registration decides: a member exempted for the broadcast and
    /// re-registered as temporary afterwards is deleted.
    pub fn cleanup_all(&self, strategy: CleanupStrategy) -> CleanupSummary {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            tracing::warn!("cleanup_all called twice; ignoring");
            return CleanupSummary::default();
        }

        let entries = self.entries.lock();
        let manifest = self.manifest.lock();
        let mut summary = CleanupSummary::default();
        let mut seen: HashSet<&Path> = HashSet::new();

        tracing::info!("Cleaning up artifacts ({} registered)", entries.len());

        for entry in entries.iter().rev() {
            if !seen.insert(entry.path.as_path()) {
                continue;
            }
            if !entry.path.exists() {
                continue;
            }

            let delete = match strategy {
                CleanupStrategy::TemporariesOnly => entry.kind == ArtifactKind::Temporary,
                CleanupStrategy::RetainManifestOnly => !manifest.contains(&entry.path),
            };

            if !delete {
                summary.kept += 1;
                continue;
            }

            match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    tracing::debug!("Removed: {}", entry.path.display());
                    summary.removed += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {e}", entry.path.display());
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
