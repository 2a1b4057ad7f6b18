//! The repository model: owner of the current snapshot of one root.
//!
//! The model is purely in-memory. Running the collaborator queries is the
//! responsibility of the refresh layer; the model only turns their outputs
//! into a new [`Snapshot`] and swaps it in.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use dstat_classify::{absolute_paths, classify, tracked_closure, TreeIndex};
use dstat_types::PathItem;
use tracing::debug;

use crate::snapshot::{Snapshot, StateUpdate};

/// Owns the status snapshot and tree index of one repository root.
///
/// Readers get an `Arc<Snapshot>` and never observe a partially applied
/// update; the lock is only held for the pointer swap.
pub struct RepositoryModel {
    root: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
    tree_builds: AtomicUsize,
}

impl std::fmt::Debug for RepositoryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryModel")
            .field("root", &self.root)
            .field("tree_builds", &self.tree_builds())
            .finish()
    }
}

impl RepositoryModel {
    /// Create a model with an empty snapshot.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::empty(root.clone()))),
            root,
            tree_builds: AtomicUsize::new(0),
        }
    }

    /// The repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply the outputs of one refresh cycle and return the new snapshot.
    ///
    /// When `update.tracked` is present the tracked closure is recomputed;
    /// the tree index is rebuilt only if the listed paths changed.
    pub fn set_state(&self, update: StateUpdate) -> Arc<Snapshot> {
        let previous = self.get_state();

        let (tracked, listed, tree) = match &update.tracked {
            Some(entries) => {
                let relative = || entries.iter().map(|entry| entry.path.as_str());
                let listed = absolute_paths(&self.root, relative());
                let tracked = tracked_closure(&self.root, relative());

                if listed == *previous.listed {
                    (tracked, Arc::clone(&previous.listed), Arc::clone(&previous.tree))
                } else {
                    let tree = TreeIndex::build(&self.root, &listed);
                    self.tree_builds.fetch_add(1, Ordering::Relaxed);
                    debug!(root = %self.root.display(), listed = listed.len(), "rebuilt tree index");
                    (tracked, Arc::new(listed), Arc::new(tree))
                }
            }
            None => (
                previous.status.tracked.clone(),
                Arc::clone(&previous.listed),
                Arc::clone(&previous.tree),
            ),
        };

        let status = classify(&self.root, &update.diff, &update.status, &tracked)
            .into_status_set(tracked, update.untracked);

        let next = Arc::new(Snapshot {
            root: self.root.clone(),
            status,
            tree,
            listed,
        });

        *self.snapshot.write().expect("snapshot lock poisoned") = Arc::clone(&next);
        next
    }

    /// The current snapshot.
    pub fn get_state(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().expect("snapshot lock poisoned"))
    }

    /// The direct children of `path`, or nothing if `path` is not a directory
    /// in the tree index.
    pub fn get_children(&self, path: &Path) -> Vec<PathItem> {
        self.get_state().children(path).to_vec()
    }

    /// Returns `true` if any of added, deleted, git-modified, modified or
    /// renamed is non-empty.
    pub fn has_changes(&self) -> bool {
        self.get_state().status.has_changes()
    }

    /// Returns `true` if `path` is in the tracked closure.
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.get_state().status.is_tracked(path)
    }

    /// How many times the tree index has been built.
    pub fn tree_builds(&self) -> usize {
        self.tree_builds.load(Ordering::Relaxed)
    }

    /// Tracked paths, used by callers that only need membership.
    pub fn tracked(&self) -> BTreeSet<PathBuf> {
        self.get_state().status.tracked.clone()
    }
}
