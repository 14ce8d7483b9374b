//! Thread-scoped ambient security context
//!
//! The ambient value is thread-local: concurrent operations on different
//! worker threads never observe each other's overrides. An override is
//! installed by [`with_context`] and reverted by dropping the returned
//! [`OperationContextGuard`], which is the only restore path; it runs on
//! every exit, including panics and cancellation unwinds.
//!
//! This is safe to use only when the caller knows it is operating in the
//! local node's own context (e.g. system workers). Calling it from an
//! arbitrary user thread whose ambient context is unknown is a misuse this
//! module does not guard against.

use crate::context::SecurityContext;
use log::trace;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static AMBIENT: RefCell<Option<Arc<SecurityContext>>> = RefCell::new(None);
}

/// Ambient security context of the calling thread.
///
/// `None` means security is disabled or no override is active.
pub fn current() -> Option<Arc<SecurityContext>> {
    AMBIENT.with(|ambient| ambient.borrow().clone())
}

/// Install `ctx` as the ambient context for the calling thread.
///
/// `None` means the local node's own context applies or security is disabled,
/// so no change is needed: the call is a no-op returning `None`. Otherwise the
/// prior ambient value is captured in the returned guard and restored when the
/// guard drops.
pub fn with_context(ctx: Option<Arc<SecurityContext>>) -> Option<OperationContextGuard> {
    let ctx = ctx?;

    let previous = AMBIENT.with(|ambient| ambient.borrow_mut().replace(ctx.clone()));

    trace!("Installed security context for subject {}", ctx.subject_id());

    Some(OperationContextGuard {
        previous,
        _not_send: PhantomData,
    })
}

/// Scoped override of the ambient security context.
///
/// Single-owner and bound to the thread that created it; dropping it restores
/// the prior ambient value exactly once. Nested guards must be dropped in LIFO
/// order, which Rust scoping already enforces for stack-held guards.
#[must_use = "dropping the guard immediately reverts the context override"]
pub struct OperationContextGuard {
    previous: Option<Arc<SecurityContext>>,
    // Raw pointer keeps the guard !Send: it must drop on the installing thread.
    _not_send: PhantomData<*const ()>,
}

impl Drop for OperationContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        AMBIENT.with(|ambient| {
            *ambient.borrow_mut() = previous;
        });
        trace!("Restored prior security context");
    }
}

impl std::fmt::Debug for OperationContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContextGuard")
            .field(
                "previous_subject",
                &self.previous.as_ref().map(|c| c.subject_id()),
            )
            .finish()
    }
}
