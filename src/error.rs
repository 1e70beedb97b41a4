use thiserror::Error;

use crate::store::RemoteStoreError;

/// Error taxonomy for the sync engine and exam layer.
///
/// Two delivery policies share this type: content mutations consume
/// `Remote` internally (the outbox logs and retries, the caller never
/// sees it), while attempt/scoring operations propagate it so the
/// presentation layer can offer a retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("remote store error: {0}")]
    Remote(#[from] RemoteStoreError),

    #[error("cache corruption: {0}")]
    CacheCorruption(String),

    #[error("cascade inconsistency: {0}")]
    CascadeInconsistency(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::Validation(errors.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
