use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the law tree and amendment engines.
///
/// Malformed HTML fragments and empty matches are not errors: the former
/// degrade to tag-stripped text, the latter yield empty lists.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The amendment document path does not exist.
    #[error("input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A stored law blob does not decode into the expected input shape.
    #[error("malformed {what}: {source}")]
    MalformedContent {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
