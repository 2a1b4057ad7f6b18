//! Snapshot consumers for dstat.
//!
//! Both publishers are fed by the refresh layer after every successful cycle:
//! the [`SourceControlGrouper`] first, then the [`DecorationBroadcaster`].
//! Hosts subscribe to their broadcast channels to learn about changes.

pub mod config;
pub mod decoration;
pub mod event;
pub mod scm;

pub use config::ScmConfig;
pub use decoration::{Decoration, DecorationBroadcaster};
pub use event::{DecorationsChanged, EventStream, SourceControlChanged};
pub use scm::{ResourceGroup, ResourceState, SourceControlGrouper, SourceControlState};
