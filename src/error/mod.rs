//! Unified error handling for the security layer
//!
//! Every failure in this crate maps to one `SecurityError` variant. All of them
//! propagate to the immediate caller; none are retried internally.

use thiserror::Error;
use uuid::Uuid;

/// Security-related errors
#[derive(Error, Debug)]
pub enum SecurityError {
    /// Programmer misuse: a required argument was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The node has no published security context attribute.
    ///
    /// Callers may treat this as "security context unknown" rather than crash.
    #[error("Security context isn't certain for node {0}")]
    IdentityUnavailable(Uuid),

    /// The authenticator yielded no context for the supplied credentials.
    /// Fatal for the join attempt; the node is not admitted.
    #[error("Authentication failed for local node: {0}")]
    AuthenticationRejected(Uuid),

    /// The security context could not be marshalled for publication.
    /// Raised before anything reaches the attribute bundle.
    #[error("Authentication subject is not serializable: {source}")]
    SerializationRefused {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Reconstructing a context from a node attribute failed.
    #[error("Failed to get security context: {source}")]
    DeserializationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A failure raised by a wrapped call inside the sandbox channel,
    /// re-raised with the original cause attached.
    #[error("Sandboxed invocation failed: {source}")]
    SandboxedInvocationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An authorization check refused the operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SecurityError {
    /// Wrap a callee failure raised inside the sandbox channel.
    pub fn sandboxed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        SecurityError::SandboxedInvocationFailed {
            source: Box::new(source),
        }
    }
}

pub type SecurityResult<T> = Result<T, SecurityError>;
