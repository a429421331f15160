//! Error types shared by the audit data providers.

use thiserror::Error;

/// Errors surfaced by audit data provider operations.
///
/// Nothing is swallowed: every failure propagates to the immediate caller,
/// and no failure state is retained between calls. A missing record on a
/// valid lookup is not an error; `get_event` returns `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Invalid or missing configuration, surfaced when the underlying
    /// client handle is built.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A user-supplied selector or callback failed. Selector failures are
    /// propagated unmodified and never retried.
    #[error("Selector error: {0}")]
    Selector(String),

    /// The underlying client reported a write failure.
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    /// The underlying client reported a read failure.
    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    /// The event could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cancellation signal fired while the call was in flight. Writes
    /// already flushed to the wire may still land at the remote store.
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation is structurally not offered by this provider.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

impl AuditError {
    /// Create a selector error from any displayable cause.
    pub fn selector(cause: impl std::fmt::Display) -> Self {
        AuditError::Selector(cause.to_string())
    }

    /// Create a configuration error from any displayable cause.
    pub fn configuration(cause: impl std::fmt::Display) -> Self {
        AuditError::Configuration(cause.to_string())
    }

    /// Check if this error indicates a cancelled call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuditError::Cancelled)
    }

    /// Check if this error indicates an unsupported operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AuditError::Unsupported(_))
    }
}

/// Result type alias for audit data provider operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;
