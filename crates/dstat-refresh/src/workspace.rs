use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dstat_model::Snapshot;
use tracing::{debug, info};

use crate::config::RefreshConfig;
use crate::error::{RefreshError, RefreshResult};
use crate::orchestrator::RefreshOrchestrator;
use crate::queries::{RepositoryQueries, UntrackedSource};

/// One orchestrator per repository root of an open workspace.
///
/// Roots share the collaborators and configuration but nothing else; a
/// failing root never affects the others.
pub struct WorkspaceRepositories {
    queries: Arc<dyn RepositoryQueries>,
    untracked: Arc<dyn UntrackedSource>,
    config: RefreshConfig,
    repositories: RwLock<BTreeMap<PathBuf, Arc<RefreshOrchestrator>>>,
}

impl WorkspaceRepositories {
    pub fn new(
        queries: Arc<dyn RepositoryQueries>,
        untracked: Arc<dyn UntrackedSource>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            queries,
            untracked,
            config,
            repositories: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register `root`, returning the existing orchestrator if it is known.
    pub fn add_root(&self, root: impl Into<PathBuf>) -> Arc<RefreshOrchestrator> {
        let root = root.into();
        let mut repositories = self.repositories.write().expect("workspace lock poisoned");
        Arc::clone(repositories.entry(root.clone()).or_insert_with(|| {
            info!(root = %root.display(), "repository added");
            RefreshOrchestrator::new(
                root.clone(),
                Arc::clone(&self.queries),
                Arc::clone(&self.untracked),
                &self.config,
            )
        }))
    }

    pub fn remove_root(&self, root: &Path) -> Option<Arc<RefreshOrchestrator>> {
        let removed = self
            .repositories
            .write()
            .expect("workspace lock poisoned")
            .remove(root);
        if removed.is_some() {
            info!(root = %root.display(), "repository removed");
        }
        removed
    }

    pub fn get(&self, root: &Path) -> Option<Arc<RefreshOrchestrator>> {
        self.repositories
            .read()
            .expect("workspace lock poisoned")
            .get(root)
            .cloned()
    }

    /// The orchestrator whose root contains `path`, preferring the deepest.
    pub fn owner_of(&self, path: &Path) -> Option<Arc<RefreshOrchestrator>> {
        let repositories = self.repositories.read().expect("workspace lock poisoned");
        path.ancestors()
            .find_map(|candidate| repositories.get(candidate))
            .cloned()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.repositories
            .read()
            .expect("workspace lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Run a full refresh of every root concurrently. Results are in root
    /// order.
    pub async fn reset_all(&self) -> Vec<(PathBuf, RefreshResult<Arc<Snapshot>>)> {
        let repositories: Vec<_> = self
            .repositories
            .read()
            .expect("workspace lock poisoned")
            .iter()
            .map(|(root, orchestrator)| (root.clone(), Arc::clone(orchestrator)))
            .collect();
        debug!(roots = repositories.len(), "refreshing workspace");

        let handles: Vec<_> = repositories
            .into_iter()
            .map(|(root, orchestrator)| {
                (root, tokio::spawn(async move { orchestrator.reset_state().await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (root, handle) in handles {
            let result = handle.await.unwrap_or_else(|_| Err(RefreshError::Aborted));
            results.push((root, result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryError, QueryResult};
    use async_trait::async_trait;
    use dstat_types::{DiffOutput, StatusOutput, TrackedEntry};
    use std::collections::BTreeSet;

    /// Lists one file per root; roots named `broken` fail every query.
    struct PerRoot;

    fn check(root: &Path) -> QueryResult<()> {
        if root.ends_with("broken") {
            Err(QueryError::Malformed("garbage".into()))
        } else {
            Ok(())
        }
    }

    #[async_trait]
    impl RepositoryQueries for PerRoot {
        async fn tracked_list(&self, root: &Path) -> QueryResult<Vec<TrackedEntry>> {
            check(root)?;
            Ok(vec![TrackedEntry::file("data.csv")])
        }

        async fn diff_against_head(&self, root: &Path) -> QueryResult<DiffOutput> {
            check(root)?;
            Ok(DiffOutput::default())
        }

        async fn status_against_cache(&self, root: &Path) -> QueryResult<StatusOutput> {
            check(root)?;
            Ok(StatusOutput::new())
        }
    }

    #[async_trait]
    impl UntrackedSource for PerRoot {
        async fn untracked_paths(&self, _root: &Path) -> QueryResult<BTreeSet<PathBuf>> {
            Ok(BTreeSet::new())
        }
    }

    fn workspace() -> WorkspaceRepositories {
        let queries = Arc::new(PerRoot);
        WorkspaceRepositories::new(queries.clone(), queries, RefreshConfig::default())
    }

    #[test]
    fn add_is_idempotent_and_remove_forgets() {
        let ws = workspace();
        let first = ws.add_root("/work/a");
        let again = ws.add_root("/work/a");
        assert!(Arc::ptr_eq(&first, &again));
        ws.add_root("/work/b");
        assert_eq!(ws.roots(), vec![PathBuf::from("/work/a"), PathBuf::from("/work/b")]);

        assert!(ws.remove_root(Path::new("/work/a")).is_some());
        assert!(ws.remove_root(Path::new("/work/a")).is_none());
        assert!(ws.get(Path::new("/work/a")).is_none());
    }

    #[test]
    fn owner_prefers_deepest_root() {
        let ws = workspace();
        ws.add_root("/work");
        ws.add_root("/work/nested");
        let owner = ws.owner_of(Path::new("/work/nested/data/x.csv")).unwrap();
        assert_eq!(owner.root(), Path::new("/work/nested"));
        assert_eq!(ws.owner_of(Path::new("/work/y")).unwrap().root(), Path::new("/work"));
        assert!(ws.owner_of(Path::new("/elsewhere")).is_none());
    }

    #[tokio::test]
    async fn reset_all_isolates_roots() {
        let ws = workspace();
        ws.add_root("/work/good");
        ws.add_root("/work/broken");

        let results = ws.reset_all().await;
        assert_eq!(results.len(), 2);
        let (broken_root, broken) = &results[0];
        let (good_root, good) = &results[1];
        assert_eq!(broken_root, Path::new("/work/broken"));
        assert!(broken.is_err());
        assert_eq!(good_root, Path::new("/work/good"));
        let snapshot = good.as_ref().unwrap();
        assert!(snapshot.status.tracked.contains(Path::new("/work/good/data.csv")));

        let broken = ws.get(Path::new("/work/broken")).unwrap();
        assert_eq!(broken.consecutive_failures(), 1);
        assert!(broken.model().get_state().status.tracked.is_empty());
    }
}
