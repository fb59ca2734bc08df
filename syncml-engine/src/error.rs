//! Error types for the synchronization engine.

use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller violated a precondition (removing a remote store,
    /// configuring an inconsistent manual route).
    #[error("logical error: {0}")]
    Logical(String),

    /// An invariant the engine should have maintained was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// Malformed wire content: wrong content type or unparsable payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Requested codec name is not registered.
    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    /// An abstract hook was invoked without a concrete implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Model persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external decision was awaited past its deadline.
    #[error("decision timed out: {0}")]
    Timeout(String),
}
