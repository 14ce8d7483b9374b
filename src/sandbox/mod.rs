//! Privilege-reducing execution channel for untrusted user code
//!
//! The channel itself is a pluggable capability: the platform injects an
//! implementation that runs a closure under reduced privilege. This module
//! owns the channel contract, the thread marker that answers "am I currently
//! inside the sandbox", and the trust classification and interception layers
//! in the submodules.

pub mod classifier;
pub mod gate;

use crate::error::SecurityResult;
use serde_json::Value;
use std::cell::Cell;

/// One mediated call, produced by the interception proxy.
pub type SandboxedOp<'a> = &'a mut dyn FnMut() -> SecurityResult<Value>;

/// Privilege-reducing execution channel.
///
/// Implementations may serialize access internally; callers impose no locking
/// of their own. Executing through the channel constrains *capabilities*, not
/// *identity*: the ambient security context is left untouched.
pub trait Sandbox: Send + Sync {
    /// Whether the sandbox is switched on for this node.
    fn enabled(&self) -> bool;

    /// Run `op` under reduced privilege and return its result.
    ///
    /// Implementations should hold a [`SandboxScope`] for the duration of the
    /// call so [`is_inside_sandbox`] reports correctly.
    fn execute(&self, op: SandboxedOp<'_>) -> SecurityResult<Value>;
}

/// Channel used when sandboxing is disabled: runs operations directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSandbox;

impl Sandbox for NoopSandbox {
    fn enabled(&self) -> bool {
        false
    }

    fn execute(&self, op: SandboxedOp<'_>) -> SecurityResult<Value> {
        op()
    }
}

thread_local! {
    static INSIDE_SANDBOX: Cell<bool> = Cell::new(false);
}

/// True if the current thread is executing inside the sandbox channel.
pub fn is_inside_sandbox() -> bool {
    INSIDE_SANDBOX.with(Cell::get)
}

/// Marks the current thread as sandboxed for the guard's lifetime.
///
/// Channel implementations enter a scope around user code; nesting is allowed
/// and the marker reverts to its prior state on drop.
#[must_use = "dropping the scope immediately clears the sandbox marker"]
pub struct SandboxScope {
    was_inside: bool,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl SandboxScope {
    pub fn enter() -> Self {
        let was_inside = INSIDE_SANDBOX.with(|flag| flag.replace(true));
        Self {
            was_inside,
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for SandboxScope {
    fn drop(&mut self) {
        INSIDE_SANDBOX.with(|flag| flag.set(self.was_inside));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_marker_scoped() {
        assert!(!is_inside_sandbox());
        {
            let _scope = SandboxScope::enter();
            assert!(is_inside_sandbox());
            {
                let _nested = SandboxScope::enter();
                assert!(is_inside_sandbox());
            }
            assert!(is_inside_sandbox());
        }
        assert!(!is_inside_sandbox());
    }

    #[test]
    fn test_noop_sandbox_runs_directly() {
        let sandbox = NoopSandbox;
        assert!(!sandbox.enabled());

        let result = sandbox
            .execute(&mut || Ok(Value::String("ran".to_string())))
            .unwrap();
        assert_eq!(result, Value::String("ran".to_string()));
    }

    #[test]
    fn test_marker_is_per_thread() {
        let _scope = SandboxScope::enter();
        assert!(is_inside_sandbox());

        let other = std::thread::spawn(is_inside_sandbox).join().unwrap();
        assert!(!other);
    }
}
