//! Provider error types
//!
//! Error definitions with transient/permanent classification for retry
//! logic.

use thiserror::Error;

use crate::types::{ResourceId, ResourceKind};

/// Error that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    // Connection errors (usually transient)
    /// Failed to reach the control plane.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Call timed out.
    #[error("call timed out after {timeout_secs} seconds")]
    CallTimeout { timeout_secs: u64 },

    /// The control plane is temporarily unavailable or throttling.
    #[error("control plane unavailable: {message}")]
    Unavailable { message: String },

    // Authentication errors (permanent)
    /// Invalid credentials.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Spec errors (permanent)
    /// The resource spec was rejected by the provider.
    #[error("invalid resource spec for '{name}': {message}")]
    InvalidSpec { name: String, message: String },

    /// The provider does not support this resource kind.
    #[error("unsupported resource kind: {kind}")]
    UnsupportedKind { kind: ResourceKind },

    // Operation errors
    /// No resource exists with the given identifier.
    #[error("resource not found: {id}")]
    ResourceNotFound { id: ResourceId },

    /// A conflicting resource already exists.
    #[error("resource conflict: {identifier}")]
    ResourceConflict { identifier: String },

    /// The remote call failed.
    #[error("call failed: {message}")]
    CallFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProviderError {
    /// Create a connection failure without a source error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a call failure without a source error.
    pub fn call_failed(message: impl Into<String>) -> Self {
        Self::CallFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid-spec error.
    pub fn invalid_spec(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Connection-level failures are transient; authentication, spec, and
    /// conflict errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionFailed { .. }
                | ProviderError::CallTimeout { .. }
                | ProviderError::Unavailable { .. }
        )
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::connection_failed("reset by peer").is_transient());
        assert!(ProviderError::CallTimeout { timeout_secs: 30 }.is_transient());
        assert!(ProviderError::Unavailable {
            message: "throttled".into()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!ProviderError::AuthenticationFailed.is_transient());
        assert!(!ProviderError::invalid_spec("video", "missing hash key").is_transient());
        assert!(!ProviderError::call_failed("boom").is_transient());
    }
}
