//! Error types for the StudyHub engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error types
///
/// Every collaborator failure is caught at the mutation gateway boundary and
/// converted into one of these variants; callers never see a raw error from
/// the remote store or an external service.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A required collaborator (store, auth, AI) is not configured
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// The caller is not allowed to perform the operation
    #[error("denied: {0}")]
    Denied(String),

    /// The remote store reported a failure; local state is unchanged
    #[error("remote operation failed: {0}")]
    Remote(String),

    /// The operation conflicts with current remote state
    /// (e.g. fulfilling an already-fulfilled request)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced document does not exist in the target collection
    #[error("not found: {0}")]
    NotFound(String),

    /// Document could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl EngineError {
    /// Whether re-invoking the same operation could succeed.
    ///
    /// Remote failures are transient and retried only by the user;
    /// denials and conflicts are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Remote(_) | EngineError::Unavailable(_))
    }
}
