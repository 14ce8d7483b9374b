//! Interception of untrusted callees
//!
//! User-supplied callees implement [`SandboxTarget`]. Wrapping one with
//! [`sandboxed_proxy`] yields either the original (zero-overhead path for a
//! disabled sandbox or a trusted type) or a stateless decorator that routes
//! every call through the privilege-reducing channel while leaving the
//! ambient security context untouched.

use crate::error::{SecurityError, SecurityResult};
use crate::sandbox::{classifier, Sandbox};
use log::debug;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// A callee the platform may have to mediate.
///
/// `user_object` is the "wraps a user object" indirection: a platform-owned
/// holder that carries a user-supplied payload reports that payload here so
/// classification and unwrapping apply to the payload rather than the holder.
pub trait SandboxTarget: Send + Sync {
    /// Execute the callee with a JSON payload.
    fn invoke(&self, input: Value) -> SecurityResult<Value>;

    /// Concrete-type access for trust classification.
    fn as_any(&self) -> &dyn Any;

    /// The wrapped user object, if this target is a wrapper.
    fn user_object(&self) -> Option<&dyn Any> {
        None
    }
}

/// Wrap `target` in an interception proxy when mediation is required.
///
/// Returns `target` unchanged (the same `Arc`) when the sandbox is disabled or
/// the target's type — after unwrapping the user-object indirection —
/// classifies as a system type. Otherwise returns a proxy whose `invoke` runs
/// through the channel and whose `user_object` bypasses it, so orchestration
/// code can still unwrap a mediated target without triggering privilege
/// reduction.
///
/// The proxy holds only the channel and the original; it is safe to share
/// across threads.
pub fn sandboxed_proxy(
    sandbox: &Arc<dyn Sandbox>,
    target: Arc<dyn SandboxTarget>,
) -> Arc<dyn SandboxTarget> {
    if !sandbox.enabled() || classifier::is_system_target(target.as_ref(), true) {
        return target;
    }

    debug!("Mediating untrusted callee through the sandbox channel");

    Arc::new(SandboxedProxy {
        sandbox: Arc::clone(sandbox),
        original: target,
    })
}

/// Unwrap the user-object indirection, when present.
pub fn unwrap_target(target: &dyn SandboxTarget) -> &dyn Any {
    match target.user_object() {
        Some(user_object) => user_object,
        None => target.as_any(),
    }
}

struct SandboxedProxy {
    sandbox: Arc<dyn Sandbox>,
    original: Arc<dyn SandboxTarget>,
}

impl SandboxTarget for SandboxedProxy {
    fn invoke(&self, input: Value) -> SecurityResult<Value> {
        let original = &self.original;

        self.sandbox.execute(&mut || {
            original
                .invoke(input.clone())
                .map_err(|e| SecurityError::sandboxed(e))
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    // Forwarded directly to the original, bypassing the channel.
    fn user_object(&self) -> Option<&dyn Any> {
        self.original.user_object()
    }
}
