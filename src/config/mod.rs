//! Dynamic configuration collaborator
//!
//! The security layer does not implement configuration storage or validation;
//! it only needs the "apply a validated mutation, get a future" contract when
//! permission-gated configuration changes pass through it.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a configuration change.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The mutation failed validation and was not applied.
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// The mutation was valid but could not be applied.
    #[error("Configuration change failed: {0}")]
    Apply(String),
}

/// A configuration tree that accepts validated mutations.
#[async_trait]
pub trait DynamicConfig: Send + Sync {
    /// Apply `mutation` to the tree. Resolves once the change is validated
    /// and persisted, or fails with a [`ConfigError`].
    async fn change(&self, mutation: Value) -> Result<(), ConfigError>;
}
