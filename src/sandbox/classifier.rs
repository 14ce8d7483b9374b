//! Trust classification of callee types
//!
//! Platform modules register their types (or whole origin tags) at load time;
//! classification compares a type's registered origin against the platform's
//! own. The result is memoized per `TypeId` in a process-wide, append-only
//! cache: a type's code origin cannot change after load, so entries are never
//! invalidated. Concurrent first-lookups may race to compute the same boolean;
//! the computation is pure, so the duplicate write is harmless.
//!
//! Policy note: a type with no registered origin classifies as *trusted*.
//! This permissive fallback is deliberate but notable: hosts that register
//! every loadable user type can flip it with [`set_unknown_origin_trusted`].

use crate::sandbox::gate::SandboxTarget;
use log::debug;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Origin tag of the platform's own code.
pub const PLATFORM_ORIGIN: &str = "foldsec.platform";

/// Registered origin per type, populated at load time.
static REGISTERED_ORIGINS: Lazy<RwLock<HashMap<TypeId, &'static str>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Memoized classification results.
static SYSTEM_TYPES: Lazy<RwLock<HashMap<TypeId, bool>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Fallback for types with no registered origin.
static UNKNOWN_ORIGIN_TRUSTED: AtomicBool = AtomicBool::new(true);

/// Register `T` as originating from the platform's own code.
pub fn register_system_type<T: 'static>() {
    register_type_origin::<T>(PLATFORM_ORIGIN);
}

/// Register `T` with an explicit origin tag.
///
/// Registration after a type was already classified does not rewrite the
/// memoized result; register types at load time, before first use.
pub fn register_type_origin<T: 'static>(origin: &'static str) {
    REGISTERED_ORIGINS
        .write()
        .expect("origin registry poisoned")
        .insert(TypeId::of::<T>(), origin);
}

/// Set whether a type with no registered origin classifies as trusted.
///
/// Affects only types not yet classified; memoized results stay as computed.
pub fn set_unknown_origin_trusted(trusted: bool) {
    UNKNOWN_ORIGIN_TRUSTED.store(trusted, Ordering::SeqCst);
}

/// Whether `T` is a system (platform-trusted) type.
pub fn is_system_type<T: 'static>() -> bool {
    is_system_type_id(TypeId::of::<T>())
}

/// Whether the type behind `type_id` is a system type.
pub fn is_system_type_id(type_id: TypeId) -> bool {
    if let Some(cached) = SYSTEM_TYPES
        .read()
        .expect("system types cache poisoned")
        .get(&type_id)
    {
        return *cached;
    }

    let is_system = match REGISTERED_ORIGINS
        .read()
        .expect("origin registry poisoned")
        .get(&type_id)
    {
        Some(origin) => *origin == PLATFORM_ORIGIN,
        None => UNKNOWN_ORIGIN_TRUSTED.load(Ordering::SeqCst),
    };

    debug!("Classified type {type_id:?} as system={is_system}");

    SYSTEM_TYPES
        .write()
        .expect("system types cache poisoned")
        .insert(type_id, is_system);

    is_system
}

/// Whether `target`'s concrete type is a system type.
///
/// With `unwrap_first`, a target that declares it wraps a user object is
/// classified by the *wrapped* object's type instead of its own.
pub fn is_system_target(target: &dyn SandboxTarget, unwrap_first: bool) -> bool {
    if unwrap_first {
        if let Some(user_object) = target.user_object() {
            return is_system_type_id(Any::type_id(user_object));
        }
    }

    is_system_type_id(Any::type_id(target.as_any()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecurityResult;
    use serde_json::Value;

    struct PlatformTask;
    struct UserTask;
    struct UnregisteredTask;
    struct WrappingTask;

    impl SandboxTarget for WrappingTask {
        fn invoke(&self, input: Value) -> SecurityResult<Value> {
            Ok(input)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn user_object(&self) -> Option<&dyn std::any::Any> {
            static INNER: UserTask = UserTask;
            Some(&INNER)
        }
    }

    impl SandboxTarget for UserTask {
        fn invoke(&self, input: Value) -> SecurityResult<Value> {
            Ok(input)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_registered_origins_classify() {
        register_system_type::<PlatformTask>();
        register_type_origin::<UserTask>("user.deployment");

        assert!(is_system_type::<PlatformTask>());
        assert!(!is_system_type::<UserTask>());
    }

    #[test]
    fn test_unknown_origin_defaults_to_trusted() {
        assert!(is_system_type::<UnregisteredTask>());
    }

    #[test]
    fn test_memoization_is_stable_under_concurrency() {
        struct Contended;
        register_type_origin::<Contended>("user.deployment");

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(is_system_type::<Contended>))
            .collect();

        for handle in handles {
            assert!(!handle.join().unwrap());
        }
        // Later lookups agree with the first.
        assert!(!is_system_type::<Contended>());
    }

    #[test]
    fn test_wrapper_unwrapped_before_classification() {
        register_type_origin::<UserTask>("user.deployment");
        register_system_type::<WrappingTask>();

        let wrapper = WrappingTask;
        // The wrapper itself is platform code, but the wrapped object decides.
        assert!(!is_system_target(&wrapper, true));
        assert!(is_system_target(&wrapper, false));
    }
}
