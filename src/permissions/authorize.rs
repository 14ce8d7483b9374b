//! Exhaustive authorization of declared permission sets

use crate::error::SecurityResult;
use crate::permissions::{PermissionSet, SecurityPermission};
use crate::security::ClusterSecurity;
use log::warn;
use std::collections::HashMap;

/// Issue one authorization check for every grant declared in `permissions`.
///
/// No-op when security is disabled. Otherwise every system permission and every
/// (name, kind) pair in the cache, task and service scopes is checked exactly
/// once. Checks are not short-circuited on a denial decision made elsewhere;
/// the only early exit is an error propagated from the underlying check itself.
/// The order across the three named scopes is unspecified.
pub fn authorize_all(
    security: &dyn ClusterSecurity,
    permissions: &PermissionSet,
) -> SecurityResult<()> {
    if !security.enabled() {
        return Ok(());
    }

    if let Some(system) = &permissions.system_permissions {
        for permission in system {
            security.authorize(*permission).map_err(|e| {
                warn!("System permission check failed: {e}");
                e
            })?;
        }
    }

    authorize_scope(security, &permissions.cache_permissions)?;
    authorize_scope(security, &permissions.task_permissions)?;
    authorize_scope(security, &permissions.service_permissions)
}

fn authorize_scope(
    security: &dyn ClusterSecurity,
    permissions: &HashMap<String, Vec<SecurityPermission>>,
) -> SecurityResult<()> {
    if permissions.is_empty() {
        return Ok(());
    }

    for (name, grants) in permissions {
        for permission in grants {
            security.authorize_named(name, *permission)?;
        }
    }

    Ok(())
}
