use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dstat_types::{DiffOutput, StatusOutput, TrackedEntry};

use crate::error::QueryResult;

/// The data tool's view of a repository root.
#[async_trait]
pub trait RepositoryQueries: Send + Sync {
    /// Every tracked path, relative to `root`.
    async fn tracked_list(&self, root: &Path) -> QueryResult<Vec<TrackedEntry>>;
    /// Workspace changes against the last commit.
    async fn diff_against_head(&self, root: &Path) -> QueryResult<DiffOutput>;
    /// Workspace changes against the cache, per pipeline stage.
    async fn status_against_cache(&self, root: &Path) -> QueryResult<StatusOutput>;
}

/// The code repository's view of untracked files.
#[async_trait]
pub trait UntrackedSource: Send + Sync {
    /// Absolute paths of untracked files under `root`.
    async fn untracked_paths(&self, root: &Path) -> QueryResult<BTreeSet<PathBuf>>;
}
