//! File decorations.
//!
//! The broadcaster keeps the last applied snapshot and answers
//! [`DecorationBroadcaster::resolve`] from memory. Each update invalidates the
//! union of decorated paths of the old and the new snapshot: a path leaving a
//! bucket needs its decoration re-evaluated as much as a path entering one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dstat_model::Snapshot;
use dstat_types::{StatusKind, StatusSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{DecorationsChanged, EventStream, Notifier};

/// The decoration shown for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decoration {
    Added,
    Deleted,
    Modified,
    NotInCache,
    Renamed,
    GitModified,
    /// Neutral marker for tracked paths in no other bucket.
    Tracked,
}

impl Decoration {
    /// Classification keys in resolution order; the first bucket containing
    /// a path wins.
    pub const PRIORITY: [(StatusKind, Decoration); 6] = [
        (StatusKind::Added, Decoration::Added),
        (StatusKind::Deleted, Decoration::Deleted),
        (StatusKind::Modified, Decoration::Modified),
        (StatusKind::NotInCache, Decoration::NotInCache),
        (StatusKind::Renamed, Decoration::Renamed),
        (StatusKind::GitModified, Decoration::GitModified),
    ];

    /// Resolve the decoration of `path` against a status set.
    pub fn resolve(status: &StatusSet, path: &Path) -> Option<Decoration> {
        Self::PRIORITY
            .iter()
            .find(|(kind, _)| status.get(*kind).contains(path))
            .map(|(_, decoration)| *decoration)
            .or_else(|| status.is_tracked(path).then_some(Decoration::Tracked))
    }

    pub fn badge(&self) -> Option<&'static str> {
        match self {
            Decoration::Added => Some("A"),
            Decoration::Deleted => Some("D"),
            Decoration::Modified | Decoration::GitModified => Some("M"),
            Decoration::NotInCache => Some("NC"),
            Decoration::Renamed => Some("R"),
            Decoration::Tracked => None,
        }
    }

    /// Theme color identifier for the host.
    pub fn color(&self) -> Option<&'static str> {
        match self {
            Decoration::Added => Some("gitDecoration.addedResourceForeground"),
            Decoration::Deleted => Some("gitDecoration.deletedResourceForeground"),
            Decoration::Modified => Some("gitDecoration.modifiedResourceForeground"),
            Decoration::NotInCache => Some("gitDecoration.ignoredResourceForeground"),
            Decoration::Renamed => Some("gitDecoration.renamedResourceForeground"),
            Decoration::GitModified => Some("gitDecoration.stageModifiedResourceForeground"),
            Decoration::Tracked => None,
        }
    }

    pub fn tooltip(&self) -> &'static str {
        match self {
            Decoration::Added => "Added",
            Decoration::Deleted => "Deleted",
            Decoration::Modified => "Modified",
            Decoration::NotInCache => "Not In Cache",
            Decoration::Renamed => "Renamed",
            Decoration::GitModified => "Modified (ready for commit)",
            Decoration::Tracked => "Tracked",
        }
    }
}

/// Every path that carries a decoration under `status`.
fn decorated_paths(status: &StatusSet) -> impl Iterator<Item = &PathBuf> {
    Decoration::PRIORITY
        .iter()
        .map(|(kind, _)| *kind)
        .chain(std::iter::once(StatusKind::Tracked))
        .flat_map(move |kind| status.get(kind).iter())
}

/// Resolves decorations for one root and announces invalidations.
pub struct DecorationBroadcaster {
    root: PathBuf,
    state: RwLock<Arc<Snapshot>>,
    notifier: Notifier<DecorationsChanged>,
}

impl DecorationBroadcaster {
    /// Create a broadcaster with an empty snapshot.
    pub fn new(root: impl Into<PathBuf>, channel_capacity: usize) -> Self {
        let root = root.into();
        Self {
            state: RwLock::new(Arc::new(Snapshot::empty(root.clone()))),
            root,
            notifier: Notifier::new(channel_capacity),
        }
    }

    /// Swap in `snapshot` and emit one batched invalidation event.
    pub fn set_state(&self, snapshot: Arc<Snapshot>) -> DecorationsChanged {
        let paths: BTreeSet<PathBuf> = {
            let mut state = self.state.write().expect("decoration lock poisoned");
            let union = decorated_paths(&state.status)
                .chain(decorated_paths(&snapshot.status))
                .cloned()
                .collect();
            *state = snapshot;
            union
        };

        let event = DecorationsChanged {
            root: self.root.clone(),
            paths: paths.into_iter().collect(),
        };
        debug!(root = %self.root.display(), paths = event.paths.len(), "decorations invalidated");
        self.notifier.send(event.clone());
        event
    }

    /// The decoration of `path` in the last applied snapshot.
    pub fn resolve(&self, path: &Path) -> Option<Decoration> {
        let state = self.state.read().expect("decoration lock poisoned");
        Decoration::resolve(&state.status, path)
    }

    /// Subscribe to invalidation events.
    pub fn subscribe(&self) -> EventStream<DecorationsChanged> {
        self.notifier.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    /// The last applied snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read().expect("decoration lock poisoned"))
    }
}
