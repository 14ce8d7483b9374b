//! Node authentication at join time
//!
//! The authenticator itself is pluggable; this module owns the join-time
//! contract around it and ships a reference implementation that verifies an
//! Ed25519 signature over the joining node's id.

use crate::context::{SecurityContext, SecurityCredentials, SecuritySubject, SubjectType};
use crate::error::{SecurityError, SecurityResult};
use crate::node::{ClusterNode, ATTR_AUTHENTICATION_ENABLED};
use crate::permissions::PermissionSet;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{info, warn};
use std::collections::HashMap;

/// Connection-time authentication capability.
pub trait NodeAuthenticator: Send + Sync {
    /// Authenticate a joining node. `Ok(None)` means the credentials were
    /// examined and rejected.
    fn authenticate_node(
        &self,
        node: &ClusterNode,
        credentials: Option<&SecurityCredentials>,
    ) -> SecurityResult<Option<SecurityContext>>;
}

/// Authenticate the local node during startup or join.
///
/// Credentials must be supplied unless the node carries the explicit
/// authentication-exemption attribute. An authenticator that yields no
/// context fails the join attempt outright; retry policy, if any, belongs to
/// the membership layer.
pub fn authenticate_local_node(
    node: &ClusterNode,
    credentials: Option<&SecurityCredentials>,
    authenticator: &dyn NodeAuthenticator,
) -> SecurityResult<SecurityContext> {
    if credentials.is_none() && !node.attributes().contains(ATTR_AUTHENTICATION_ENABLED) {
        return Err(SecurityError::InvalidArgument(format!(
            "Node {} supplied no credentials and is not marked authentication-exempt",
            node.id()
        )));
    }

    match authenticator.authenticate_node(node, credentials)? {
        Some(ctx) => {
            info!(
                "Authenticated local node {} as subject {}",
                node.id(),
                ctx.subject_id()
            );
            Ok(ctx)
        }
        None => {
            warn!("Authentication rejected for local node {}", node.id());
            Err(SecurityError::AuthenticationRejected(node.id()))
        }
    }
}

/// Reference authenticator: verifies an Ed25519 signature over the node id.
///
/// Each admissible login is registered with its verifying key and the
/// permission set it will be granted. Credentials carry the login and a
/// base64-encoded signature of the node id's bytes as the secret.
#[derive(Default)]
pub struct SignatureNodeAuthenticator {
    keys: HashMap<String, VerifyingKey>,
    grants: HashMap<String, PermissionSet>,
}

impl SignatureNodeAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a login with its verifying key and granted permissions.
    pub fn register(&mut self, login: String, key: VerifyingKey, permissions: PermissionSet) {
        self.keys.insert(login.clone(), key);
        self.grants.insert(login, permissions);
    }

    fn verify(&self, login: &str, node: &ClusterNode, secret: &str) -> SecurityResult<bool> {
        let Some(key) = self.keys.get(login) else {
            return Ok(false);
        };

        let sig_bytes = general_purpose::STANDARD
            .decode(secret)
            .map_err(|e| SecurityError::InvalidArgument(format!("Malformed signature: {e}")))?;

        let sig_bytes: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| SecurityError::InvalidArgument("Signature must be 64 bytes".to_string()))?;

        let signature = Signature::from_bytes(&sig_bytes);

        Ok(key.verify(node.id().as_bytes(), &signature).is_ok())
    }
}

impl NodeAuthenticator for SignatureNodeAuthenticator {
    fn authenticate_node(
        &self,
        node: &ClusterNode,
        credentials: Option<&SecurityCredentials>,
    ) -> SecurityResult<Option<SecurityContext>> {
        let Some(credentials) = credentials else {
            return Ok(None);
        };

        let Some(secret) = credentials.secret.as_deref() else {
            return Ok(None);
        };

        if !self.verify(&credentials.login, node, secret)? {
            return Ok(None);
        }

        let permissions = self
            .grants
            .get(&credentials.login)
            .cloned()
            .unwrap_or_default();

        Ok(Some(SecurityContext::new(SecuritySubject::new(
            node.id(),
            SubjectType::RemoteNode,
            credentials.login.clone(),
            permissions,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeAttributes;
    use crate::permissions::{PermissionSetBuilder, SecurityPermission};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use serde_json::json;
    use uuid::Uuid;

    fn node() -> ClusterNode {
        ClusterNode::new(Uuid::new_v4(), "node-1".to_string(), NodeAttributes::new())
    }

    fn signed_credentials(login: &str, signing_key: &SigningKey, node: &ClusterNode) -> SecurityCredentials {
        let signature = signing_key.sign(node.id().as_bytes());
        SecurityCredentials::new(login.to_string())
            .with_secret(general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    #[test]
    fn test_successful_authentication() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let mut authenticator = SignatureNodeAuthenticator::new();
        authenticator.register(
            "node-user".to_string(),
            signing_key.verifying_key(),
            PermissionSetBuilder::new()
                .system(&[SecurityPermission::JoinAsServer])
                .build(),
        );

        let node = node();
        let credentials = signed_credentials("node-user", &signing_key, &node);

        let ctx = authenticate_local_node(&node, Some(&credentials), &authenticator).unwrap();

        assert_eq!(ctx.subject_id(), node.id());
        assert_eq!(ctx.subject().login, "node-user");
        assert!(ctx.system_operation_allowed(SecurityPermission::JoinAsServer));
    }

    #[test]
    fn test_rejection_is_fatal_and_inputs_unchanged() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        let mut authenticator = SignatureNodeAuthenticator::new();
        authenticator.register(
            "node-user".to_string(),
            signing_key.verifying_key(),
            PermissionSet::default(),
        );

        let node = node();
        // Signed with the wrong key: examined and rejected.
        let credentials = signed_credentials("node-user", &other_key, &node);
        let before = (node.clone(), credentials.clone());

        let err = authenticate_local_node(&node, Some(&credentials), &authenticator).unwrap_err();

        match err {
            SecurityError::AuthenticationRejected(id) => assert_eq!(id, node.id()),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(before, (node, credentials));
    }

    #[test]
    fn test_unknown_login_rejected() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let authenticator = SignatureNodeAuthenticator::new();

        let node = node();
        let credentials = signed_credentials("ghost", &signing_key, &node);

        let err = authenticate_local_node(&node, Some(&credentials), &authenticator).unwrap_err();
        assert!(matches!(err, SecurityError::AuthenticationRejected(_)));
    }

    #[test]
    fn test_missing_credentials_require_exemption_attribute() {
        let authenticator = SignatureNodeAuthenticator::new();
        let node = node();

        let err = authenticate_local_node(&node, None, &authenticator).unwrap_err();
        assert!(matches!(err, SecurityError::InvalidArgument(_)));
    }

    #[test]
    fn test_exempt_node_reaches_authenticator() {
        // An exempt node passes the precondition; this authenticator still
        // rejects it because there are no credentials to verify.
        let authenticator = SignatureNodeAuthenticator::new();
        let mut attrs = NodeAttributes::new();
        attrs.insert(ATTR_AUTHENTICATION_ENABLED, json!(false));
        let node = ClusterNode::new(Uuid::new_v4(), "exempt".to_string(), attrs);

        let err = authenticate_local_node(&node, None, &authenticator).unwrap_err();
        assert!(matches!(err, SecurityError::AuthenticationRejected(_)));
    }
}
