use thiserror::Error;

/// Errors produced while decoding collaborator output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed {kind} output: {message}")]
    Malformed { kind: &'static str, message: String },

    #[error("unknown stage entry: {0}")]
    UnknownStageEntry(String),
}

impl TypeError {
    pub(crate) fn malformed(kind: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            kind,
            message: err.to_string(),
        }
    }
}

/// Convenience alias for decoding results.
pub type TypeResult<T> = Result<T, TypeError>;
