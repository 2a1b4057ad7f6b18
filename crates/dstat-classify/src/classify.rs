//! Path classification: merges the diff against head with the status against
//! the cache.
//!
//! The two reports have different granularity. The diff lists files and whole
//! directories (`data/raw/`), while the cache status lists stage outputs,
//! which are frequently directories. A path changed against head is banded by
//! walking from the path up to the root and taking the first cache report
//! found on the way: directory-level cache changes dominate file-level head
//! changes.
//!
//! Every path that does not resolve into the tracked set is dropped. Tracking
//! may change between the listing and the diff/status queries of one cycle,
//! so such paths are expected and never reported.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dstat_types::{ancestors_within, to_absolute, DiffOutput, PathStatus, StatusOutput, StatusSet};
use tracing::debug;

/// The six derived sets produced by [`classify`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub added: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
    pub renamed: BTreeSet<PathBuf>,
    pub modified: BTreeSet<PathBuf>,
    pub git_modified: BTreeSet<PathBuf>,
    pub not_in_cache: BTreeSet<PathBuf>,
}

impl Classification {
    /// Combine with the tracked and untracked sets into a full [`StatusSet`].
    pub fn into_status_set(self, tracked: BTreeSet<PathBuf>, untracked: BTreeSet<PathBuf>) -> StatusSet {
        StatusSet {
            added: self.added,
            deleted: self.deleted,
            renamed: self.renamed,
            modified: self.modified,
            git_modified: self.git_modified,
            not_in_cache: self.not_in_cache,
            tracked,
            untracked,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CacheBand {
    Modified,
    NotInCache,
}

/// Tracked outputs the cache status reports as changed.
#[derive(Debug, Default)]
struct CacheChanges {
    modified: BTreeSet<PathBuf>,
    not_in_cache: BTreeSet<PathBuf>,
}

impl CacheChanges {
    fn collect(root: &Path, status: &StatusOutput, tracked: &BTreeSet<PathBuf>) -> Self {
        let mut acc = Self::default();

        for (relative, path_status) in status.changed_outs() {
            let band = match path_status {
                PathStatus::Modified => &mut acc.modified,
                PathStatus::NotInCache => &mut acc.not_in_cache,
                PathStatus::Other(_) => continue,
            };
            let path = to_absolute(root, relative);
            if tracked.contains(&path) {
                band.insert(path);
            }
        }

        acc
    }

    fn band_at(&self, path: &Path) -> Option<CacheBand> {
        if self.not_in_cache.contains(path) {
            Some(CacheBand::NotInCache)
        } else if self.modified.contains(path) {
            Some(CacheBand::Modified)
        } else {
            None
        }
    }

    /// The nearest cache report on the walk from `path` up to `root`.
    fn band_of(&self, root: &Path, path: &Path) -> Option<CacheBand> {
        std::iter::once(path)
            .chain(ancestors_within(root, path))
            .find_map(|candidate| self.band_at(candidate))
    }
}

fn resolve_tracked(root: &Path, tracked: &BTreeSet<PathBuf>, paths: &[String]) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .map(|relative| to_absolute(root, relative))
        .filter(|path| tracked.contains(path))
        .collect()
}

/// Classify the diff and status reports of one cycle against `tracked`.
pub fn classify(
    root: &Path,
    diff: &DiffOutput,
    status: &StatusOutput,
    tracked: &BTreeSet<PathBuf>,
) -> Classification {
    let cache = CacheChanges::collect(root, status, tracked);
    let head_modified = resolve_tracked(root, tracked, &diff.modified);

    let mut result = Classification {
        added: resolve_tracked(root, tracked, &diff.added),
        deleted: resolve_tracked(root, tracked, &diff.deleted),
        renamed: diff
            .renamed
            .iter()
            .map(|rename| to_absolute(root, &rename.new))
            .filter(|path| tracked.contains(path))
            .collect(),
        not_in_cache: resolve_tracked(root, tracked, &diff.not_in_cache),
        ..Classification::default()
    };

    for path in head_modified {
        match cache.band_of(root, &path) {
            None => result.git_modified.insert(path),
            Some(CacheBand::Modified) => result.modified.insert(path),
            Some(CacheBand::NotInCache) => result.not_in_cache.insert(path),
        };
    }
    result.modified.extend(cache.modified);

    debug!(
        root = %root.display(),
        modified = result.modified.len(),
        git_modified = result.git_modified.len(),
        not_in_cache = result.not_in_cache.len(),
        "classified paths"
    );

    result
}
