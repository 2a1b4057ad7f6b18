//! Repository model for dstat.
//!
//! One [`RepositoryModel`] exists per repository root. It applies the pure
//! algorithms of `dstat-classify` to the collaborator outputs of each refresh
//! cycle and publishes the result as an immutable [`Snapshot`].

pub mod repository;
pub mod snapshot;

pub use repository::RepositoryModel;
pub use snapshot::{Snapshot, StateUpdate};

// Re-export key types
pub use dstat_classify::TreeIndex;
pub use dstat_types::{PathItem, StatusKind, StatusSet};
