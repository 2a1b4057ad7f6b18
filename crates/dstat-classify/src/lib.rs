//! Pure classification for dstat.
//!
//! Everything in this crate is a total function over already-decoded
//! collaborator output: no I/O, no errors. Paths that cannot be resolved
//! against the tracked set are filtered out, never escalated.
//!
//! # Key Types
//!
//! - [`classify`] -- Merge the diff against head with the cache status
//! - [`tracked_closure`] -- Listed paths plus their ancestor directories
//! - [`TreeIndex`] -- Parent-to-children map with synthesized directories
//! - [`resolve_selection`] -- Batch a multi-selection by repository root

pub mod classify;
pub mod closure;
pub mod selection;
pub mod tree;

pub use classify::{classify, Classification};
pub use closure::{absolute_paths, tracked_closure};
pub use selection::{resolve_selection, tracked_targets};
pub use tree::TreeIndex;
