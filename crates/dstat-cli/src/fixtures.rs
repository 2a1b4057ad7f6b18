//! Collaborators backed by recorded JSON output.
//!
//! Each query reads one file from the fixtures directory. A missing file
//! stands for empty output; any other read failure is transient, and output
//! that does not decode is malformed.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dstat_refresh::{QueryError, QueryResult, RepositoryQueries, UntrackedSource};
use dstat_types::{to_absolute, DiffOutput, StatusOutput, TrackedEntry};
use tracing::debug;

pub const LIST_FILE: &str = "list.json";
pub const DIFF_FILE: &str = "diff.json";
pub const STATUS_FILE: &str = "status.json";
pub const UNTRACKED_FILE: &str = "untracked.json";

pub struct FixtureQueries {
    dir: PathBuf,
}

impl FixtureQueries {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, name: &str) -> QueryResult<Option<String>> {
        let path = self.dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "fixture missing, treating as empty");
                Ok(None)
            }
            Err(err) => Err(QueryError::Transient(format!("{}: {err}", path.display()))),
        }
    }
}

#[async_trait]
impl RepositoryQueries for FixtureQueries {
    async fn tracked_list(&self, _root: &Path) -> QueryResult<Vec<TrackedEntry>> {
        match self.read(LIST_FILE).await? {
            Some(text) => Ok(TrackedEntry::list_from_json(&text)?),
            None => Ok(Vec::new()),
        }
    }

    async fn diff_against_head(&self, _root: &Path) -> QueryResult<DiffOutput> {
        match self.read(DIFF_FILE).await? {
            Some(text) => Ok(DiffOutput::from_json(&text)?),
            None => Ok(DiffOutput::default()),
        }
    }

    async fn status_against_cache(&self, _root: &Path) -> QueryResult<StatusOutput> {
        match self.read(STATUS_FILE).await? {
            Some(text) => Ok(StatusOutput::from_json(&text)?),
            None => Ok(StatusOutput::new()),
        }
    }
}

#[async_trait]
impl UntrackedSource for FixtureQueries {
    /// `untracked.json` holds an array of paths relative to the root.
    async fn untracked_paths(&self, root: &Path) -> QueryResult<BTreeSet<PathBuf>> {
        let Some(text) = self.read(UNTRACKED_FILE).await? else {
            return Ok(BTreeSet::new());
        };
        let relative: Vec<String> = serde_json::from_str(&text)
            .map_err(|err| QueryError::Malformed(format!("{UNTRACKED_FILE}: {err}")))?;
        Ok(relative.iter().map(|rel| to_absolute(root, rel)).collect())
    }
}
