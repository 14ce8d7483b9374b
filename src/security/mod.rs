//! Security facade: the seam between this layer and the permission policy
//!
//! `ClusterSecurity` is what node-lifecycle and request-dispatch code talk to.
//! The concrete decision policy is pluggable; this module ships a no-op
//! implementation for disabled security and a basic one that enforces the
//! active context's own permission set.

use crate::context::scope::{self, OperationContextGuard};
use crate::context::SecurityContext;
use crate::error::{SecurityError, SecurityResult};
use crate::permissions::{compatible_service_permissions, SecurityPermission};
use crate::sandbox::{NoopSandbox, Sandbox};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Node-wide security facade.
pub trait ClusterSecurity: Send + Sync {
    /// Whether security is enabled on this node.
    fn enabled(&self) -> bool;

    /// The context whose identity is active for the calling operation, or
    /// `None` when security is disabled.
    fn security_context(&self) -> Option<Arc<SecurityContext>>;

    /// True when the active context is the local node's own.
    fn is_default_context(&self) -> bool;

    /// Install `ctx` as the active context for the calling thread.
    fn with_context(&self, ctx: Arc<SecurityContext>) -> Option<OperationContextGuard> {
        if !self.enabled() {
            return None;
        }
        scope::with_context(Some(ctx))
    }

    /// Check a system-wide permission for the active subject.
    fn authorize(&self, permission: SecurityPermission) -> SecurityResult<()>;

    /// Check a named-resource permission for the active subject.
    fn authorize_named(&self, name: &str, permission: SecurityPermission) -> SecurityResult<()>;

    /// The sandbox channel of this node.
    fn sandbox(&self) -> Arc<dyn Sandbox>;
}

/// The active context when it differs from the local node's own; `None` when
/// security is disabled or the default context is active.
pub fn remote_security_context(
    security: &dyn ClusterSecurity,
) -> Option<Arc<SecurityContext>> {
    if !security.enabled() || security.is_default_context() {
        return None;
    }

    security.security_context()
}

/// Active subject id if security is enabled.
pub fn security_subject_id(security: &dyn ClusterSecurity) -> Option<Uuid> {
    if !security.enabled() {
        return None;
    }

    security.security_context().map(|ctx| ctx.subject_id())
}

/// Install a remote context carried with an incoming operation.
///
/// `None` means the local node's context applies, so nothing changes and no
/// guard is returned. Safe only from threads known to run in the local node's
/// own context (system workers).
pub fn with_remote_security_context(
    security: &dyn ClusterSecurity,
    ctx: Option<Arc<SecurityContext>>,
) -> Option<OperationContextGuard> {
    security.with_context(ctx?)
}

/// Facade for nodes with security switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClusterSecurity;

impl ClusterSecurity for NoopClusterSecurity {
    fn enabled(&self) -> bool {
        false
    }

    fn security_context(&self) -> Option<Arc<SecurityContext>> {
        None
    }

    fn is_default_context(&self) -> bool {
        true
    }

    fn authorize(&self, _permission: SecurityPermission) -> SecurityResult<()> {
        Ok(())
    }

    fn authorize_named(&self, _name: &str, _permission: SecurityPermission) -> SecurityResult<()> {
        Ok(())
    }

    fn sandbox(&self) -> Arc<dyn Sandbox> {
        Arc::new(NoopSandbox)
    }
}

/// Reference facade enforcing the active context's own permission set.
///
/// Hosts with an external policy engine implement [`ClusterSecurity`]
/// themselves; this one is enough for nodes whose grants are fully described
/// by the contexts minted at authentication time.
pub struct BasicClusterSecurity {
    enabled: bool,
    compatibility_mode: bool,
    local_context: Arc<SecurityContext>,
    sandbox: Arc<dyn Sandbox>,
}

impl BasicClusterSecurity {
    pub fn new(
        config: &SecurityConfig,
        local_context: Arc<SecurityContext>,
        sandbox: Arc<dyn Sandbox>,
    ) -> Self {
        // The config switch wins over the injected channel.
        let sandbox: Arc<dyn Sandbox> = if config.sandbox_enabled {
            sandbox
        } else {
            Arc::new(NoopSandbox)
        };

        Self {
            enabled: config.enabled,
            compatibility_mode: config.security_compatibility_mode,
            local_context,
            sandbox,
        }
    }

    fn active_context(&self) -> Arc<SecurityContext> {
        scope::current().unwrap_or_else(|| self.local_context.clone())
    }

    fn deny(name: Option<&str>, permission: SecurityPermission, subject: Uuid) -> SecurityError {
        let target = name.map_or(String::new(), |n| format!(" on '{n}'"));
        debug!("Denied {permission:?}{target} for subject {subject}");
        SecurityError::AccessDenied(format!("{permission:?}{target} denied for subject {subject}"))
    }
}

impl ClusterSecurity for BasicClusterSecurity {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn security_context(&self) -> Option<Arc<SecurityContext>> {
        if !self.enabled {
            return None;
        }
        Some(self.active_context())
    }

    fn is_default_context(&self) -> bool {
        scope::current()
            .map_or(true, |ctx| ctx.subject_id() == self.local_context.subject_id())
    }

    fn authorize(&self, permission: SecurityPermission) -> SecurityResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let ctx = self.active_context();
        if ctx.system_operation_allowed(permission) {
            Ok(())
        } else {
            Err(Self::deny(None, permission, ctx.subject_id()))
        }
    }

    fn authorize_named(&self, name: &str, permission: SecurityPermission) -> SecurityResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let ctx = self.active_context();

        let allowed = match permission {
            SecurityPermission::CacheRead
            | SecurityPermission::CachePut
            | SecurityPermission::CacheRemove
            | SecurityPermission::CacheCreate
            | SecurityPermission::CacheDestroy => ctx.cache_operation_allowed(name, permission),
            SecurityPermission::TaskExecute | SecurityPermission::TaskCancel => {
                ctx.task_operation_allowed(name, permission)
            }
            SecurityPermission::ServiceDeploy
            | SecurityPermission::ServiceCancel
            | SecurityPermission::ServiceInvoke => {
                ctx.service_operation_allowed(name, permission)
                    || (self.compatibility_mode
                        && compatible_service_permissions()
                            .get("*")
                            .is_some_and(|grants| grants.contains(&permission)))
            }
            _ => ctx.system_operation_allowed(permission),
        };

        if allowed {
            Ok(())
        } else {
            Err(Self::deny(Some(name), permission, ctx.subject_id()))
        }
    }

    fn sandbox(&self) -> Arc<dyn Sandbox> {
        self.sandbox.clone()
    }
}

/// Security layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Whether the security layer is active at all
    pub enabled: bool,
    /// Whether user callees run through the sandbox channel
    pub sandbox_enabled: bool,
    /// Legacy wildcard service grants for mixed-version clusters
    pub security_compatibility_mode: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sandbox_enabled: false,
            security_compatibility_mode: false,
        }
    }
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for [`SecurityConfig`]
#[derive(Debug, Default)]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SecurityConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn sandbox_enabled(mut self, enabled: bool) -> Self {
        self.config.sandbox_enabled = enabled;
        self
    }

    pub fn security_compatibility_mode(mut self, enabled: bool) -> Self {
        self.config.security_compatibility_mode = enabled;
        self
    }

    pub fn build(self) -> SecurityConfig {
        self.config
    }
}
