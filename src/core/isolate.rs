// ============================================================================
// frp-core - Failure Isolation
// Run user callbacks so that one failing step cannot poison the graph
// ============================================================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run a user callback, containing any panic it raises.
///
/// Returns `None` when `f` panicked. The panic is logged at `error` level
/// with `site` naming the combinator stage that invoked the callback.
/// Callers must not hold a `RefCell` borrow across this call.
///
/// # Example
///
/// ```
/// use frp_core::core::isolate;
///
/// assert_eq!(isolate("example", || 2 + 2), Some(4));
/// assert_eq!(isolate("example", || -> i32 { panic!("boom") }), None);
/// ```
pub fn isolate<R>(site: &'static str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            tracing::error!(
                site,
                error = %panic_message(payload.as_ref()),
                "callback panicked; treating as no occurrence"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}
