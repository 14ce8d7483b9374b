//! Permission kinds and structured permission sets
//!
//! Grants are partitioned into four scopes: system-wide permissions plus three
//! name-keyed collections (cache, task, service) mapping a resource name or
//! the wildcard `"*"` to permission kinds.

pub mod authorize;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinds of operations a subject can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityPermission {
    CacheRead,
    CachePut,
    CacheRemove,
    CacheCreate,
    CacheDestroy,
    TaskExecute,
    TaskCancel,
    ServiceDeploy,
    ServiceCancel,
    ServiceInvoke,
    EventsEnable,
    EventsDisable,
    AdminOps,
    AdminCache,
    JoinAsServer,
}

/// Structured grants for one subject.
///
/// Invariant: a name-keyed collection with no entries behaves as "no
/// restriction beyond system permissions", never as "deny all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionSet {
    /// System-wide permissions; `None` means none were declared
    pub system_permissions: Option<Vec<SecurityPermission>>,
    /// Per-cache grants keyed by cache name or `"*"`
    pub cache_permissions: HashMap<String, Vec<SecurityPermission>>,
    /// Per-task grants keyed by task name or `"*"`
    pub task_permissions: HashMap<String, Vec<SecurityPermission>>,
    /// Per-service grants keyed by service name or `"*"`
    pub service_permissions: HashMap<String, Vec<SecurityPermission>>,
    /// Whether operations with no matching grant are allowed
    pub default_allow_all: bool,
}

impl PermissionSet {
    /// Number of declared (name, kind) pairs across all scopes plus system
    /// permissions. This is how many checks [`authorize::authorize_all`]
    /// issues when security is enabled.
    pub fn declared_grants(&self) -> usize {
        let system = self.system_permissions.as_ref().map_or(0, Vec::len);
        let named = [
            &self.cache_permissions,
            &self.task_permissions,
            &self.service_permissions,
        ]
        .iter()
        .flat_map(|scope| scope.values())
        .map(Vec::len)
        .sum::<usize>();

        system + named
    }
}

/// Builder for [`PermissionSet`]
#[derive(Debug, Default)]
pub struct PermissionSetBuilder {
    set: PermissionSet,
}

impl PermissionSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare system-wide permissions
    pub fn system(mut self, permissions: &[SecurityPermission]) -> Self {
        self.set
            .system_permissions
            .get_or_insert_with(Vec::new)
            .extend_from_slice(permissions);
        self
    }

    /// Grant cache permissions for `name` (or `"*"`)
    pub fn cache(mut self, name: &str, permissions: &[SecurityPermission]) -> Self {
        self.set
            .cache_permissions
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(permissions);
        self
    }

    /// Grant task permissions for `name` (or `"*"`)
    pub fn task(mut self, name: &str, permissions: &[SecurityPermission]) -> Self {
        self.set
            .task_permissions
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(permissions);
        self
    }

    /// Grant service permissions for `name` (or `"*"`)
    pub fn service(mut self, name: &str, permissions: &[SecurityPermission]) -> Self {
        self.set
            .service_permissions
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(permissions);
        self
    }

    /// Allow operations with no matching grant
    pub fn default_allow_all(mut self, allow: bool) -> Self {
        self.set.default_allow_all = allow;
        self
    }

    pub fn build(self) -> PermissionSet {
        self.set
    }
}

/// Wildcard service grants used when a node runs in security compatibility
/// mode: every subject may deploy, cancel and invoke any service.
pub fn compatible_service_permissions() -> HashMap<String, Vec<SecurityPermission>> {
    let mut service_permissions = HashMap::new();

    service_permissions.insert(
        "*".to_string(),
        vec![
            SecurityPermission::ServiceCancel,
            SecurityPermission::ServiceDeploy,
            SecurityPermission::ServiceInvoke,
        ],
    );

    service_permissions
}
