//! Directory tree index built from the flat tracked listing.
//!
//! Every listed path is split into segments below the root and each segment
//! is registered as a child of its prefix, so intermediate directories that
//! were never listed still appear in the tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use dstat_types::PathItem;

/// Map from absolute directory path to its direct children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeIndex {
    nodes: BTreeMap<PathBuf, Vec<PathItem>>,
}

impl TreeIndex {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree for `root` from the absolute paths the tracked-file
    /// query listed. Paths outside `root` are ignored.
    pub fn build(root: &Path, listed: &BTreeSet<PathBuf>) -> Self {
        let mut acc: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();

        for path in listed {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };

            let mut parent = root.to_path_buf();
            for segment in relative.components() {
                let child = parent.join(segment);
                acc.entry(parent).or_default().insert(child.clone());
                parent = child;
            }
        }

        let nodes = acc
            .iter()
            .map(|(parent, children)| {
                let items = children
                    .iter()
                    .map(|child| PathItem {
                        root: root.to_path_buf(),
                        path: child.clone(),
                        is_directory: acc.contains_key(child),
                        is_tracked: listed.contains(child),
                    })
                    .collect();
                (parent.clone(), items)
            })
            .collect();

        Self { nodes }
    }

    /// The direct children of `path`, ordered by path. Empty for leaves and
    /// unknown paths.
    pub fn children(&self, path: &Path) -> &[PathItem] {
        self.nodes.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if `path` has at least one child.
    pub fn is_directory(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// Number of directories (nodes with children), including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate every directory and its children.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[PathItem])> {
        self.nodes
            .iter()
            .map(|(path, children)| (path.as_path(), children.as_slice()))
    }
}
