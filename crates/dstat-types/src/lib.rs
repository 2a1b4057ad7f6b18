//! Foundation types for dstat.
//!
//! This crate provides the path helpers, collaborator output shapes and
//! classification types used throughout the dstat workspace. Every other
//! dstat crate depends on `dstat-types`.
//!
//! # Key Types
//!
//! - [`DiffOutput`]: Working tree compared against the last commit
//! - [`StatusOutput`]: Per-stage comparison against the content cache
//! - [`StageEntry`]: Decoded `changed deps` / `changed outs` / `always changed` entry
//! - [`TrackedEntry`]: One entry of the tracked-file listing
//! - [`StatusSet`]: The named path-status sets of one repository root
//! - [`PathItem`]: A node surfaced by the tree index

pub mod error;
pub mod output;
pub mod path;
pub mod status;

pub use error::{TypeError, TypeResult};
pub use output::{DiffOutput, PathStatus, RenamedPath, StageEntry, StatusOutput, TrackedEntry};
pub use path::{ancestors_within, normalize_relative, to_absolute};
pub use status::{PathItem, StatusKind, StatusSet};
