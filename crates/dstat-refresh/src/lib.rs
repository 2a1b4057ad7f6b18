//! Refresh orchestration for dstat.
//!
//! The collaborators (the data tool and the code repository) are reached
//! through the [`RepositoryQueries`] and [`UntrackedSource`] traits. A
//! [`RefreshOrchestrator`] per root runs them, retries transient failures,
//! coalesces overlapping requests and feeds the results through the model to
//! the publishers.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod queries;
pub mod retry;
pub mod workspace;

pub use config::RefreshConfig;
pub use error::{ConfigError, QueryError, QueryResult, RefreshError, RefreshResult};
pub use orchestrator::{is_pipeline_metadata, RefreshKind, RefreshOrchestrator};
pub use queries::{RepositoryQueries, UntrackedSource};
pub use retry::RetryPolicy;
pub use workspace::WorkspaceRepositories;
