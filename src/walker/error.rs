//! Walker error types.

use thiserror::Error;

use crate::api::ApiError;

/// Boxed error returned by a failing transform.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced while driving a [`Walker`](super::Walker).
///
/// Communication failures never appear here: the walker records them to its
/// diagnostics sink and reports the sequence as exhausted.
#[derive(Debug, Error)]
pub enum WalkerError {
    /// Iteration was attempted before a query was configured.
    #[error("no query configured: call configure(jql, fields) first")]
    NotConfigured,

    /// The server rejected the credentials.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No issue is buffered at the cursor.
    #[error("cursor at position {position} has no current issue")]
    OutOfRange {
        /// Global index of the cursor.
        position: u32,
    },

    /// The transform failed for the current issue.
    #[error("transform failed: {0}")]
    Transform(#[source] BoxError),
}

/// Result type for walker operations.
pub type Result<T> = std::result::Result<T, WalkerError>;
