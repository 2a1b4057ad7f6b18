use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dstat_classify::TreeIndex;
use dstat_types::{DiffOutput, PathItem, StatusOutput, StatusSet, TrackedEntry};

/// One immutable view of a repository root: every status set plus the tree
/// index. Snapshots are replaced wholesale, never edited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The repository root.
    pub root: PathBuf,
    /// The classification.
    pub status: StatusSet,
    /// The directory tree of tracked paths.
    pub tree: Arc<TreeIndex>,
    /// The listed paths `tree` was built from.
    pub(crate) listed: Arc<BTreeSet<PathBuf>>,
}

impl Snapshot {
    /// An empty snapshot for `root`.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// The direct children of `path` in the tree index.
    pub fn children(&self, path: &Path) -> &[PathItem] {
        self.tree.children(path)
    }

    /// Returns `true` if `path` has children in the tree index.
    pub fn is_directory(&self, path: &Path) -> bool {
        self.tree.is_directory(path)
    }

    /// The absolute paths explicitly listed by the last tracked-file query.
    pub fn listed(&self) -> &BTreeSet<PathBuf> {
        &self.listed
    }
}

/// The collaborator outputs of one refresh cycle.
///
/// `tracked` is `None` for status-only cycles, in which case the tracked
/// closure and tree index of the previous snapshot are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub diff: DiffOutput,
    pub status: StatusOutput,
    pub tracked: Option<Vec<TrackedEntry>>,
    pub untracked: BTreeSet<PathBuf>,
}
