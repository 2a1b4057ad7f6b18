//! Multi-selection batching for actions invoked on tree items.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use dstat_types::PathItem;

use crate::tree::TreeIndex;

fn same_node(a: &PathItem, b: &PathItem) -> bool {
    a.root == b.root && a.path == b.path
}

/// Group the items an action applies to by repository root.
///
/// If `invoked` is not part of `selected`, the selection is stale and only
/// `invoked` is returned. Otherwise, per root: a selected root placeholder
/// stands for the whole root, and items below another selected item are
/// dropped in favour of that ancestor.
pub fn resolve_selection(invoked: &PathItem, selected: &[PathItem]) -> BTreeMap<PathBuf, Vec<PathItem>> {
    if !selected.iter().any(|item| same_node(item, invoked)) {
        return BTreeMap::from([(invoked.root.clone(), vec![invoked.clone()])]);
    }

    let mut by_root: BTreeMap<PathBuf, Vec<PathItem>> = BTreeMap::new();
    for item in selected {
        by_root.entry(item.root.clone()).or_default().push(item.clone());
    }

    by_root
        .into_iter()
        .map(|(root, items)| {
            let items = match items.iter().find(|item| item.is_root()) {
                Some(placeholder) => vec![placeholder.clone()],
                None => prune_descendants(items),
            };
            (root, items)
        })
        .collect()
}

fn prune_descendants(items: Vec<PathItem>) -> Vec<PathItem> {
    let paths: BTreeSet<PathBuf> = items.iter().map(|item| item.path.clone()).collect();
    let mut kept: Vec<PathItem> = Vec::with_capacity(items.len());

    for item in items {
        let has_selected_ancestor = item
            .path
            .ancestors()
            .skip(1)
            .any(|ancestor| paths.contains(ancestor));
        if has_selected_ancestor || kept.iter().any(|k| same_node(k, &item)) {
            continue;
        }
        kept.push(item);
    }

    kept
}

/// Expand items of one root into the relative paths of the tracked nodes
/// they cover: the item itself when it is tracked, otherwise every tracked
/// node beneath it. The result is sorted and free of duplicates.
pub fn tracked_targets(items: &[PathItem], tree: &TreeIndex) -> Vec<String> {
    let mut acc = BTreeSet::new();
    for item in items {
        collect_targets(item, tree, &mut acc);
    }
    acc.into_iter().collect()
}

fn collect_targets(item: &PathItem, tree: &TreeIndex, acc: &mut BTreeSet<String>) {
    if item.is_tracked {
        if let Some(relative) = item.relative_path() {
            acc.insert(relative.to_string_lossy().into_owned());
            return;
        }
    }
    for child in tree.children(&item.path) {
        collect_targets(child, tree, acc);
    }
}
