//! Tracked closure: listed paths plus every ancestor directory below the root.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dstat_types::{ancestors_within, to_absolute};

/// Resolve relative paths against `root` without adding ancestors.
///
/// Empty paths (which resolve to the root itself) and absolute paths outside
/// `root` are skipped.
pub fn absolute_paths<'a, I>(root: &Path, relative_paths: I) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    relative_paths
        .into_iter()
        .map(|rel| to_absolute(root, rel))
        .filter(|path| path != root && path.starts_with(root))
        .collect()
}

/// Expand relative paths into the absolute tracked closure.
///
/// The result holds every input path and every ancestor directory strictly
/// between it and `root`. The root itself is never included.
pub fn tracked_closure<'a, I>(root: &Path, relative_paths: I) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut acc = BTreeSet::new();

    for path in absolute_paths(root, relative_paths) {
        for ancestor in ancestors_within(root, &path) {
            // Everything above an already-present ancestor is present too.
            if !acc.insert(ancestor.to_path_buf()) {
                break;
            }
        }
        acc.insert(path);
    }

    acc
}
