// src/property/deprecation.rs

//! Scoped suppression of deprecation warnings.
//!
//! Internal reads of a property (e.g. while discovering dependencies) must not
//! emit warnings that are meant for direct user calls of a deprecated accessor.
//! The suppression is tied to the current thread and to the closure passed to
//! [`run_quietly`]; it ends on every exit path, including unwinding.

use std::cell::Cell;

use tracing::warn;

thread_local! {
    static QUIET_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct QuietGuard;

impl QuietGuard {
    fn enter() -> Self {
        QUIET_DEPTH.with(|depth| depth.set(depth.get() + 1));
        QuietGuard
    }
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        QUIET_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f` with deprecation warnings suppressed on this thread.
pub fn run_quietly<T>(f: impl FnOnce() -> T) -> T {
    let _guard = QuietGuard::enter();
    f()
}

/// Whether the current thread is inside a [`run_quietly`] scope.
pub fn is_quiet() -> bool {
    QUIET_DEPTH.with(|depth| depth.get() > 0)
}

/// Report use of a deprecated feature unless warnings are suppressed.
///
/// Returns `true` if the warning was emitted.
pub fn nag_deprecated(feature: &str) -> bool {
    if is_quiet() {
        return false;
    }
    warn!(feature = %feature, "use of deprecated feature; it will be removed in a future version");
    true
}
