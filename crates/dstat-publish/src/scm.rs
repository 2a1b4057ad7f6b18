//! Source-control resource groups.
//!
//! A path shows up once per bucket it belongs to, so a renamed file that is
//! also modified in the cache is listed under both groups.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dstat_model::Snapshot;
use dstat_types::StatusKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScmConfig;
use crate::event::{EventStream, Notifier, SourceControlChanged};

/// The four resource groups of the source-control view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceGroup {
    /// Changes that need a commit to the code repository.
    Committed,
    /// Changes in the workspace not yet recorded with the data tool.
    Uncommitted,
    NotInCache,
    Untracked,
}

impl ResourceGroup {
    pub const ALL: [ResourceGroup; 4] = [
        ResourceGroup::Committed,
        ResourceGroup::Uncommitted,
        ResourceGroup::NotInCache,
        ResourceGroup::Untracked,
    ];

    /// The status keys feeding this group, in listing order.
    pub fn kinds(&self) -> &'static [StatusKind] {
        match self {
            ResourceGroup::Committed => &[StatusKind::Added, StatusKind::GitModified, StatusKind::Renamed],
            ResourceGroup::Uncommitted => &[StatusKind::Deleted, StatusKind::Modified],
            ResourceGroup::NotInCache => &[StatusKind::NotInCache],
            ResourceGroup::Untracked => &[StatusKind::Untracked],
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ResourceGroup::Committed => "committed",
            ResourceGroup::Uncommitted => "uncommitted",
            ResourceGroup::NotInCache => "notInCache",
            ResourceGroup::Untracked => "untracked",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceGroup::Committed => "Committed",
            ResourceGroup::Uncommitted => "Changes",
            ResourceGroup::NotInCache => "Not In Cache",
            ResourceGroup::Untracked => "Untracked",
        }
    }
}

/// One entry of a resource group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    pub status: StatusKind,
    pub group: ResourceGroup,
    pub root: PathBuf,
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_tracked: bool,
}

/// Resource states partitioned by group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceControlState {
    pub committed: Vec<ResourceState>,
    pub uncommitted: Vec<ResourceState>,
    pub not_in_cache: Vec<ResourceState>,
    pub untracked: Vec<ResourceState>,
}

impl SourceControlState {
    /// Partition `snapshot`, skipping metadata files.
    pub fn from_snapshot(snapshot: &Snapshot, config: &ScmConfig) -> Self {
        let mut state = Self::default();
        for group in ResourceGroup::ALL {
            let entries = state.group_mut(group);
            for &kind in group.kinds() {
                entries.extend(
                    snapshot
                        .status
                        .get(kind)
                        .iter()
                        .filter(|path| !config.is_metadata(path))
                        .map(|path| ResourceState {
                            status: kind,
                            group,
                            root: snapshot.root.clone(),
                            path: path.clone(),
                            is_directory: snapshot.is_directory(path),
                            is_tracked: snapshot.status.is_tracked(path),
                        }),
                );
            }
        }
        state
    }

    pub fn group(&self, group: ResourceGroup) -> &[ResourceState] {
        match group {
            ResourceGroup::Committed => &self.committed,
            ResourceGroup::Uncommitted => &self.uncommitted,
            ResourceGroup::NotInCache => &self.not_in_cache,
            ResourceGroup::Untracked => &self.untracked,
        }
    }

    fn group_mut(&mut self, group: ResourceGroup) -> &mut Vec<ResourceState> {
        match group {
            ResourceGroup::Committed => &mut self.committed,
            ResourceGroup::Uncommitted => &mut self.uncommitted,
            ResourceGroup::NotInCache => &mut self.not_in_cache,
            ResourceGroup::Untracked => &mut self.untracked,
        }
    }

    /// All states, group by group.
    pub fn flatten(&self) -> Vec<ResourceState> {
        ResourceGroup::ALL
            .iter()
            .flat_map(|group| self.group(*group).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        ResourceGroup::ALL.iter().map(|g| self.group(*g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maintains the resource groups of one root.
pub struct SourceControlGrouper {
    root: PathBuf,
    config: ScmConfig,
    state: RwLock<Arc<SourceControlState>>,
    notifier: Notifier<SourceControlChanged>,
}

impl SourceControlGrouper {
    pub fn new(root: impl Into<PathBuf>, config: ScmConfig, channel_capacity: usize) -> Self {
        Self {
            root: root.into(),
            config,
            state: RwLock::new(Arc::new(SourceControlState::default())),
            notifier: Notifier::new(channel_capacity),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regroup from `snapshot` and notify subscribers.
    pub fn set_state(&self, snapshot: &Snapshot) -> Arc<SourceControlState> {
        let next = Arc::new(SourceControlState::from_snapshot(snapshot, &self.config));
        *self.state.write().expect("resource group lock poisoned") = Arc::clone(&next);

        debug!(
            root = %self.root.display(),
            committed = next.committed.len(),
            uncommitted = next.uncommitted.len(),
            not_in_cache = next.not_in_cache.len(),
            untracked = next.untracked.len(),
            "resource groups updated"
        );
        self.notifier.send(SourceControlChanged {
            root: self.root.clone(),
            state: Arc::clone(&next),
        });
        next
    }

    /// Every resource state as one flat list.
    pub fn get_state(&self) -> Vec<ResourceState> {
        self.groups().flatten()
    }

    /// The current groups.
    pub fn groups(&self) -> Arc<SourceControlState> {
        Arc::clone(&self.state.read().expect("resource group lock poisoned"))
    }

    pub fn subscribe(&self) -> EventStream<SourceControlChanged> {
        self.notifier.subscribe()
    }
}
