//! Marshalling the security context in and out of node attributes
//!
//! The byte format belongs to the injected [`Marshaller`]; this module owns
//! only the attachment and extraction around the well-known attribute key.
//! Payload bytes travel base64-encoded inside the JSON attribute value.

use crate::context::SecurityContext;
use crate::error::{SecurityError, SecurityResult};
use crate::node::{ClusterNode, NodeAttributes, ATTR_SECURITY_SUBJECT};
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use serde_json::Value;
use thiserror::Error;

/// Marshalling errors, reported with the underlying cause attached.
#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("Failed to marshal security context: {0}")]
    Encode(String),

    #[error("Failed to unmarshal security context: {0}")]
    Decode(String),
}

/// Byte-level codec for security contexts. Injected, never owned here.
pub trait Marshaller: Send + Sync {
    fn marshal(&self, ctx: &SecurityContext) -> Result<Vec<u8>, MarshalError>;

    fn unmarshal(&self, bytes: &[u8]) -> Result<SecurityContext, MarshalError>;
}

/// Default marshaller carrying the context as JSON bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaller;

impl Marshaller for JsonMarshaller {
    fn marshal(&self, ctx: &SecurityContext) -> Result<Vec<u8>, MarshalError> {
        serde_json::to_vec(ctx).map_err(|e| MarshalError::Encode(e.to_string()))
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<SecurityContext, MarshalError> {
        serde_json::from_slice(bytes).map_err(|e| MarshalError::Decode(e.to_string()))
    }
}

/// Marshal `ctx` and add it to the node attributes.
///
/// Returns a **new** bundle; the input is never mutated. A context the
/// marshaller refuses surfaces as `SerializationRefused` before any bundle is
/// produced, so nothing half-published can reach the wire.
pub fn with_security_context(
    ctx: &SecurityContext,
    attrs: &NodeAttributes,
    marshaller: &dyn Marshaller,
) -> SecurityResult<NodeAttributes> {
    let bytes = marshaller
        .marshal(ctx)
        .map_err(|e| SecurityError::SerializationRefused {
            source: Box::new(e),
        })?;

    debug!(
        "Publishing security context for subject {} ({} bytes)",
        ctx.subject_id(),
        bytes.len()
    );

    Ok(attrs.with_entry(
        ATTR_SECURITY_SUBJECT,
        Value::String(general_purpose::STANDARD.encode(bytes)),
    ))
}

/// Reconstruct a node's security context from its attributes.
///
/// A missing attribute means the context isn't certain (`IdentityUnavailable`);
/// an attribute that cannot be decoded reports the marshaller's failure as the
/// cause (`DeserializationFailed`). The two conditions are distinct on purpose:
/// the first is recoverable by the caller, the second is a data fault.
pub fn node_security_context(
    marshaller: &dyn Marshaller,
    node: &ClusterNode,
) -> SecurityResult<SecurityContext> {
    let attr = node
        .attributes()
        .get(ATTR_SECURITY_SUBJECT)
        .ok_or_else(|| SecurityError::IdentityUnavailable(node.id()))?;

    let encoded = attr
        .as_str()
        .ok_or_else(|| SecurityError::DeserializationFailed {
            source: Box::new(MarshalError::Decode(
                "security subject attribute is not a string".to_string(),
            )),
        })?;

    let bytes =
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SecurityError::DeserializationFailed {
                source: Box::new(MarshalError::Decode(e.to_string())),
            })?;

    marshaller
        .unmarshal(&bytes)
        .map_err(|e| SecurityError::DeserializationFailed {
            source: Box::new(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SecuritySubject, SubjectType};
    use crate::permissions::{PermissionSetBuilder, SecurityPermission};
    use serde_json::json;
    use uuid::Uuid;

    fn sample_context() -> SecurityContext {
        SecurityContext::new(SecuritySubject::new(
            Uuid::new_v4(),
            SubjectType::RemoteNode,
            "node-1".to_string(),
            PermissionSetBuilder::new()
                .system(&[SecurityPermission::JoinAsServer])
                .cache("orders", &[SecurityPermission::CacheRead])
                .build(),
        ))
    }

    /// Marshaller that refuses every context.
    struct RefusingMarshaller;

    impl Marshaller for RefusingMarshaller {
        fn marshal(&self, _ctx: &SecurityContext) -> Result<Vec<u8>, MarshalError> {
            Err(MarshalError::Encode("subject is not serializable".to_string()))
        }

        fn unmarshal(&self, _bytes: &[u8]) -> Result<SecurityContext, MarshalError> {
            Err(MarshalError::Decode("unreachable".to_string()))
        }
    }

    #[test]
    fn test_publication_round_trip() {
        let marshaller = JsonMarshaller;
        let ctx = sample_context();
        let attrs = NodeAttributes::new();

        let published = with_security_context(&ctx, &attrs, &marshaller).unwrap();
        let node = ClusterNode::new(ctx.subject_id(), "node-1".to_string(), published);

        let restored = node_security_context(&marshaller, &node).unwrap();

        assert_eq!(restored.subject_id(), ctx.subject_id());
        assert_eq!(restored.subject().permissions, ctx.subject().permissions);
    }

    #[test]
    fn test_input_bundle_never_mutated() {
        let marshaller = JsonMarshaller;
        let ctx = sample_context();
        let mut attrs = NodeAttributes::new();
        attrs.insert("region", json!("eu-west"));

        let published = with_security_context(&ctx, &attrs, &marshaller).unwrap();

        assert_eq!(attrs.len(), 1);
        assert!(!attrs.contains(ATTR_SECURITY_SUBJECT));
        assert!(published.contains(ATTR_SECURITY_SUBJECT));
    }

    #[test]
    fn test_refused_context_fails_before_publication() {
        let ctx = sample_context();
        let attrs = NodeAttributes::new();

        let err = with_security_context(&ctx, &attrs, &RefusingMarshaller).unwrap_err();

        assert!(matches!(err, SecurityError::SerializationRefused { .. }));
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_missing_attribute_is_identity_unavailable() {
        let node = ClusterNode::new(Uuid::new_v4(), "node-2".to_string(), NodeAttributes::new());

        let err = node_security_context(&JsonMarshaller, &node).unwrap_err();

        match err {
            SecurityError::IdentityUnavailable(id) => assert_eq!(id, node.id()),
            other => panic!("expected IdentityUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_attribute_is_deserialization_failure() {
        let mut attrs = NodeAttributes::new();
        attrs.insert(ATTR_SECURITY_SUBJECT, json!("not base64!!!"));
        let node = ClusterNode::new(Uuid::new_v4(), "node-3".to_string(), attrs);

        let err = node_security_context(&JsonMarshaller, &node).unwrap_err();

        assert!(matches!(err, SecurityError::DeserializationFailed { .. }));
    }
}
