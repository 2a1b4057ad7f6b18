//! Collaborator output shapes.
//!
//! The query collaborators emit JSON in the tool's own layout (space-separated
//! keys, per-entry `{"path": ...}` wrappers, bare-string sentinels). The types
//! here decode that layout once, at the boundary, into plain typed values so
//! the classifier never has to guess at shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

const ALWAYS_CHANGED: &str = "always changed";
const CHANGED_DEPS: &str = "changed deps";
const CHANGED_OUTS: &str = "changed outs";

/// One entry of the tracked-file listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    /// Path relative to the repository root.
    pub path: String,
    #[serde(rename = "isdir", default)]
    pub is_directory: bool,
    #[serde(rename = "isexec", default)]
    pub is_executable: bool,
    #[serde(rename = "isout", default)]
    pub is_output: bool,
}

impl TrackedEntry {
    /// A tracked file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            is_executable: false,
            is_output: true,
        }
    }

    /// A tracked directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            is_directory: true,
            ..Self::file(path)
        }
    }

    /// Decode a tracked-file listing.
    pub fn list_from_json(json: &str) -> TypeResult<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| TypeError::malformed("list", e))
    }
}

/// A rename reported by the diff against head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedPath {
    pub old: String,
    pub new: String,
}

impl RenamedPath {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// The working tree compared against the last commit.
///
/// All paths are relative to the repository root. Directory entries in
/// `modified` carry a trailing separator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDiffOutput", into = "RawDiffOutput")]
pub struct DiffOutput {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub modified: Vec<String>,
    pub renamed: Vec<RenamedPath>,
    pub not_in_cache: Vec<String>,
}

impl DiffOutput {
    /// Decode the diff against head.
    pub fn from_json(json: &str) -> TypeResult<Self> {
        serde_json::from_str(json).map_err(|e| TypeError::malformed("diff", e))
    }

    /// Returns `true` if the diff reports nothing at all.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.deleted.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty()
            && self.not_in_cache.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct RawPath {
    path: String,
}

#[derive(Serialize, Deserialize)]
struct RawRenamed {
    path: RenamedPath,
}

#[derive(Default, Serialize, Deserialize)]
struct RawDiffOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    added: Vec<RawPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deleted: Vec<RawPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    modified: Vec<RawPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    renamed: Vec<RawRenamed>,
    #[serde(rename = "not in cache", default, skip_serializing_if = "Vec::is_empty")]
    not_in_cache: Vec<RawPath>,
}

fn unwrap_paths(raw: Vec<RawPath>) -> Vec<String> {
    raw.into_iter().map(|p| p.path).collect()
}

fn wrap_paths(paths: Vec<String>) -> Vec<RawPath> {
    paths.into_iter().map(|path| RawPath { path }).collect()
}

impl From<RawDiffOutput> for DiffOutput {
    fn from(raw: RawDiffOutput) -> Self {
        Self {
            added: unwrap_paths(raw.added),
            deleted: unwrap_paths(raw.deleted),
            modified: unwrap_paths(raw.modified),
            renamed: raw.renamed.into_iter().map(|r| r.path).collect(),
            not_in_cache: unwrap_paths(raw.not_in_cache),
        }
    }
}

impl From<DiffOutput> for RawDiffOutput {
    fn from(diff: DiffOutput) -> Self {
        Self {
            added: wrap_paths(diff.added),
            deleted: wrap_paths(diff.deleted),
            modified: wrap_paths(diff.modified),
            renamed: diff
                .renamed
                .into_iter()
                .map(|path| RawRenamed { path })
                .collect(),
            not_in_cache: wrap_paths(diff.not_in_cache),
        }
    }
}

/// Per-path status reported inside a stage entry.
///
/// Only `modified` and `not in cache` take part in classification; every
/// other status is kept verbatim and ignored downstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PathStatus {
    Modified,
    NotInCache,
    Other(String),
}

impl PathStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PathStatus::Modified => "modified",
            PathStatus::NotInCache => "not in cache",
            PathStatus::Other(s) => s,
        }
    }
}

impl From<String> for PathStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "modified" => PathStatus::Modified,
            "not in cache" => PathStatus::NotInCache,
            _ => PathStatus::Other(s),
        }
    }
}

impl From<&str> for PathStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PathStatus> for String {
    fn from(status: PathStatus) -> Self {
        match status {
            PathStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// One entry in a stage's status list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStageEntry", into = "RawStageEntry")]
pub enum StageEntry {
    /// Pipeline inputs that changed. Carries no working-tree state.
    ChangedDeps(BTreeMap<String, PathStatus>),
    /// Pipeline outputs that differ from the cache.
    ChangedOuts(BTreeMap<String, PathStatus>),
    /// The stage always reruns; carries no path information.
    AlwaysChanged,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawStageEntry {
    Sentinel(String),
    Changes(BTreeMap<String, BTreeMap<String, PathStatus>>),
}

impl TryFrom<RawStageEntry> for StageEntry {
    type Error = TypeError;

    fn try_from(raw: RawStageEntry) -> Result<Self, Self::Error> {
        match raw {
            RawStageEntry::Sentinel(s) if s == ALWAYS_CHANGED => Ok(StageEntry::AlwaysChanged),
            RawStageEntry::Sentinel(s) => Err(TypeError::UnknownStageEntry(s)),
            RawStageEntry::Changes(mut map) => {
                if map.len() != 1 {
                    let keys: Vec<_> = map.keys().cloned().collect();
                    return Err(TypeError::UnknownStageEntry(keys.join(", ")));
                }
                if let Some(paths) = map.remove(CHANGED_OUTS) {
                    return Ok(StageEntry::ChangedOuts(paths));
                }
                if let Some(paths) = map.remove(CHANGED_DEPS) {
                    return Ok(StageEntry::ChangedDeps(paths));
                }
                let key = map.into_keys().next().unwrap_or_default();
                Err(TypeError::UnknownStageEntry(key))
            }
        }
    }
}

impl From<StageEntry> for RawStageEntry {
    fn from(entry: StageEntry) -> Self {
        match entry {
            StageEntry::AlwaysChanged => RawStageEntry::Sentinel(ALWAYS_CHANGED.to_string()),
            StageEntry::ChangedDeps(paths) => {
                RawStageEntry::Changes(BTreeMap::from([(CHANGED_DEPS.to_string(), paths)]))
            }
            StageEntry::ChangedOuts(paths) => {
                RawStageEntry::Changes(BTreeMap::from([(CHANGED_OUTS.to_string(), paths)]))
            }
        }
    }
}

/// Per-stage comparison of outputs and dependencies against the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusOutput {
    pub stages: BTreeMap<String, Vec<StageEntry>>,
}

impl StatusOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the status against the cache.
    pub fn from_json(json: &str) -> TypeResult<Self> {
        serde_json::from_str(json).map_err(|e| TypeError::malformed("status", e))
    }

    /// Builder-style helper to add a stage.
    pub fn with_stage(mut self, name: impl Into<String>, entries: Vec<StageEntry>) -> Self {
        self.stages.insert(name.into(), entries);
        self
    }

    /// Every `(relative path, status)` pair reported under `changed outs`,
    /// across all stages.
    pub fn changed_outs(&self) -> impl Iterator<Item = (&str, &PathStatus)> {
        self.stages
            .values()
            .flatten()
            .filter_map(|entry| match entry {
                StageEntry::ChangedOuts(paths) => Some(paths),
                _ => None,
            })
            .flatten()
            .map(|(path, status)| (path.as_str(), status))
    }
}
