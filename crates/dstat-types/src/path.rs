//! Path helpers shared by the classifier, the tree index and the model.
//!
//! Collaborators report paths relative to the repository root, sometimes with
//! a trailing separator to mark a directory. Everything past the collaborator
//! boundary works on absolute [`PathBuf`]s, whose equality and ordering are
//! component-wise.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Strip trailing separators and `.` segments from a collaborator-reported
/// relative path.
pub fn normalize_relative(relative: &str) -> PathBuf {
    Path::new(relative.trim_end_matches(is_separator))
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Resolve a collaborator-reported relative path against the repository root.
pub fn to_absolute(root: &Path, relative: &str) -> PathBuf {
    root.join(normalize_relative(relative))
}

/// Iterate the ancestors of `path` strictly between it and `root`, nearest
/// first. Yields nothing for paths outside `root`.
pub fn ancestors_within<'a>(root: &'a Path, path: &'a Path) -> impl Iterator<Item = &'a Path> {
    path.ancestors()
        .skip(1)
        .take_while(move |ancestor| *ancestor != root && ancestor.starts_with(root))
}
