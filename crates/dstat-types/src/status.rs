//! Classification types.
//!
//! A [`StatusSet`] holds the named path-status sets computed for one
//! repository root. All paths are absolute.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The name of one set inside a [`StatusSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Added,
    Deleted,
    Renamed,
    Modified,
    GitModified,
    NotInCache,
    Tracked,
    Untracked,
}

impl StatusKind {
    /// Every kind, in declaration order.
    pub const ALL: [StatusKind; 8] = [
        StatusKind::Added,
        StatusKind::Deleted,
        StatusKind::Renamed,
        StatusKind::Modified,
        StatusKind::GitModified,
        StatusKind::NotInCache,
        StatusKind::Tracked,
        StatusKind::Untracked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Added => "added",
            StatusKind::Deleted => "deleted",
            StatusKind::Renamed => "renamed",
            StatusKind::Modified => "modified",
            StatusKind::GitModified => "gitModified",
            StatusKind::NotInCache => "notInCache",
            StatusKind::Tracked => "tracked",
            StatusKind::Untracked => "untracked",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete classification of one repository root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSet {
    /// Tracked paths new relative to the last commit.
    pub added: BTreeSet<PathBuf>,
    /// Tracked paths removed relative to the last commit.
    pub deleted: BTreeSet<PathBuf>,
    /// New side of renames relative to the last commit.
    pub renamed: BTreeSet<PathBuf>,
    /// Paths whose working copy differs from the cache.
    pub modified: BTreeSet<PathBuf>,
    /// Paths changed against the last commit but already synced to the cache.
    pub git_modified: BTreeSet<PathBuf>,
    /// Tracked content missing from the local cache.
    pub not_in_cache: BTreeSet<PathBuf>,
    /// Listed paths plus every ancestor directory below the root.
    pub tracked: BTreeSet<PathBuf>,
    /// Paths the VCS reports as untracked.
    pub untracked: BTreeSet<PathBuf>,
}

impl StatusSet {
    /// Create an empty status set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the set named by `kind`.
    pub fn get(&self, kind: StatusKind) -> &BTreeSet<PathBuf> {
        match kind {
            StatusKind::Added => &self.added,
            StatusKind::Deleted => &self.deleted,
            StatusKind::Renamed => &self.renamed,
            StatusKind::Modified => &self.modified,
            StatusKind::GitModified => &self.git_modified,
            StatusKind::NotInCache => &self.not_in_cache,
            StatusKind::Tracked => &self.tracked,
            StatusKind::Untracked => &self.untracked,
        }
    }

    /// Returns `true` if any of the change sets is non-empty.
    ///
    /// `not_in_cache`, `tracked` and `untracked` do not count as changes.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty()
            && self.deleted.is_empty()
            && self.git_modified.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty())
    }

    /// Returns `true` if `path` is tracked.
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.contains(path)
    }

    /// Every kind whose set contains `path`.
    pub fn kinds_of(&self, path: &Path) -> Vec<StatusKind> {
        StatusKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).contains(path))
            .collect()
    }
}

/// One node surfaced by the tree index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    /// The repository root this node belongs to.
    pub root: PathBuf,
    /// Absolute path of the node.
    pub path: PathBuf,
    /// `true` if the node has at least one child in the tree index.
    pub is_directory: bool,
    /// `true` if the node itself was listed by the tracked-file query.
    pub is_tracked: bool,
}

impl PathItem {
    /// The placeholder item standing for a whole repository root.
    pub fn root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            path: root.clone(),
            root,
            is_directory: true,
            is_tracked: true,
        }
    }

    /// Returns `true` if this item is the placeholder for its root.
    pub fn is_root(&self) -> bool {
        self.path == self.root
    }

    /// Path relative to the root, `None` for the root placeholder.
    pub fn relative_path(&self) -> Option<&Path> {
        self.path
            .strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
    }
}
