use dstat_types::TypeError;
use thiserror::Error;

/// A failed collaborator query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The collaborator could not be reached or exited with an error.
    #[error("transient query failure: {0}")]
    Transient(String),

    /// The collaborator answered with output that does not decode.
    #[error("malformed query output: {0}")]
    Malformed(String),
}

impl QueryError {
    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Transient(_))
    }
}

impl From<TypeError> for QueryError {
    fn from(err: TypeError) -> Self {
        QueryError::Malformed(err.to_string())
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Transient(err.to_string())
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// A failed refresh cycle, shared by every caller attached to it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("query {query} failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: QueryError,
    },

    #[error("refresh cycle ended without a result")]
    Aborted,

    /// A collaborator panicked while the cycle ran.
    #[error("refresh cycle panicked: {0}")]
    Panicked(String),
}

pub type RefreshResult<T> = Result<T, RefreshError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
