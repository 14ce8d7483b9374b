//! Security context types and per-operation scoping
//!
//! A `SecurityContext` is the immutable identity of an authenticated subject,
//! created once per authentication event and shared by reference everywhere
//! "who is acting now" matters. The `scope` submodule keeps the ambient context
//! for the calling thread.

pub mod scope;

use crate::permissions::{PermissionSet, SecurityPermission};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of authenticated subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectType {
    /// A cluster node joining or participating in the topology
    RemoteNode,
    /// A thin client or application connection
    RemoteClient,
}

/// An authenticated subject: identity plus granted permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySubject {
    /// Unique subject identifier
    pub id: Uuid,
    /// What kind of subject this is
    pub subject_type: SubjectType,
    /// Login the subject authenticated with
    pub login: String,
    /// Remote address, when known
    pub address: Option<String>,
    /// Permissions granted to this subject
    pub permissions: PermissionSet,
    /// When the subject was authenticated (unix seconds)
    pub authenticated_at: i64,
}

impl SecuritySubject {
    /// Create a new subject authenticated now
    pub fn new(id: Uuid, subject_type: SubjectType, login: String, permissions: PermissionSet) -> Self {
        Self {
            id,
            subject_type,
            login,
            address: None,
            permissions,
            authenticated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Attach the remote address the subject connected from
    pub fn with_address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }
}

/// Immutable security context of an authenticated subject.
///
/// Created by the authenticator when a node or client session is admitted and
/// never mutated afterwards; components share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    subject: SecuritySubject,
}

impl SecurityContext {
    pub fn new(subject: SecuritySubject) -> Self {
        Self { subject }
    }

    pub fn subject(&self) -> &SecuritySubject {
        &self.subject
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject.id
    }

    /// Whether the subject holds the given system-wide permission.
    pub fn system_operation_allowed(&self, permission: SecurityPermission) -> bool {
        let perms = &self.subject.permissions;
        match &perms.system_permissions {
            Some(granted) => granted.contains(&permission) || perms.default_allow_all,
            None => perms.default_allow_all,
        }
    }

    /// Whether a cache operation on `name` is allowed.
    pub fn cache_operation_allowed(&self, name: &str, permission: SecurityPermission) -> bool {
        scoped_allowed(&self.subject.permissions.cache_permissions, name, permission, self.subject.permissions.default_allow_all)
    }

    /// Whether a task operation on `name` is allowed.
    pub fn task_operation_allowed(&self, name: &str, permission: SecurityPermission) -> bool {
        scoped_allowed(&self.subject.permissions.task_permissions, name, permission, self.subject.permissions.default_allow_all)
    }

    /// Whether a service operation on `name` is allowed.
    pub fn service_operation_allowed(&self, name: &str, permission: SecurityPermission) -> bool {
        scoped_allowed(&self.subject.permissions.service_permissions, name, permission, self.subject.permissions.default_allow_all)
    }
}

/// A name-keyed scope with no entries places no restriction beyond system
/// permissions; it never means "deny all".
fn scoped_allowed(
    scope: &std::collections::HashMap<String, Vec<SecurityPermission>>,
    name: &str,
    permission: SecurityPermission,
    default_allow: bool,
) -> bool {
    if scope.is_empty() {
        return true;
    }

    match scope.get(name).or_else(|| scope.get("*")) {
        Some(granted) => granted.contains(&permission),
        None => default_allow,
    }
}

/// Credentials presented at connection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityCredentials {
    /// Login of the connecting subject
    pub login: String,
    /// Secret proving the login, when the mechanism uses one
    pub secret: Option<String>,
    /// Opaque mechanism-specific payload
    pub user_object: Option<Value>,
}

impl SecurityCredentials {
    pub fn new(login: String) -> Self {
        Self {
            login,
            secret: None,
            user_object: None,
        }
    }

    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn with_user_object(mut self, user_object: Value) -> Self {
        self.user_object = Some(user_object);
        self
    }
}
