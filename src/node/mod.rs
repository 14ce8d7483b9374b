//! Cluster node identity and exchanged attributes
//!
//! A node's attribute bundle is the key/value metadata exchanged during
//! membership. This layer reads and writes exactly two well-known keys: the
//! marshaled security context of the node, and the flag a node sets when it
//! is explicitly exempt from authentication.

pub mod auth;
pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Attribute key holding the node's marshaled security context.
pub const ATTR_SECURITY_SUBJECT: &str = "foldsec.security.subject";

/// Attribute key marking a node as exempt from authentication.
pub const ATTR_AUTHENTICATION_ENABLED: &str = "foldsec.authentication.enabled";

/// A node's exchanged key/value metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    entries: HashMap<String, Value>,
}

impl NodeAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Copy-on-write entry addition: returns a new bundle, the original is
    /// left untouched.
    pub fn with_entry(&self, key: impl Into<String>, value: Value) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.into(), value);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A member of the cluster topology as seen by the security layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    id: Uuid,
    name: String,
    attributes: NodeAttributes,
}

impl ClusterNode {
    pub fn new(id: Uuid, name: String, attributes: NodeAttributes) -> Self {
        Self {
            id,
            name,
            attributes,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &NodeAttributes {
        &self.attributes
    }

    /// The same node with a replaced attribute bundle. Used when the join
    /// path publishes the marshaled security context.
    pub fn with_attributes(&self, attributes: NodeAttributes) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_entry_does_not_mutate_original() {
        let mut original = NodeAttributes::new();
        original.insert("region", json!("eu-west"));

        let augmented = original.with_entry("zone", json!("b"));

        assert_eq!(original.len(), 1);
        assert!(!original.contains("zone"));
        assert_eq!(augmented.len(), 2);
        assert_eq!(augmented.get("region"), Some(&json!("eu-west")));
    }

    #[test]
    fn test_node_attribute_access() {
        let mut attrs = NodeAttributes::new();
        attrs.insert(ATTR_AUTHENTICATION_ENABLED, json!(false));

        let node = ClusterNode::new(Uuid::new_v4(), "node-1".to_string(), attrs);

        assert!(node.attributes().contains(ATTR_AUTHENTICATION_ENABLED));
        assert!(node.attributes().get(ATTR_SECURITY_SUBJECT).is_none());
    }
}
