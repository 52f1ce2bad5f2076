// ============================================================================
// frp-core - Type Definitions
// Callback aliases and the handles shared by Future, Event and Reactive
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::isolate::isolate;

// =============================================================================
// CALLBACK ALIASES
// =============================================================================

/// Teardown callback registered with `on_cleanup`.
pub type CleanupFn = Box<dyn FnOnce()>;

/// Receiver of pushed values.
pub type Handler<A> = Rc<dyn Fn(A)>;

/// A function value that can live inside a `Reactive` or an `Event`.
pub type Func<A, B> = Rc<dyn Fn(A) -> B>;

/// A predicate value that can live inside a `Reactive`.
pub type Predicate<A> = Rc<dyn Fn(&A) -> bool>;

// =============================================================================
// UNSUBSCRIBE
// =============================================================================

/// Handle returned by every `subscribe`/`run`.
///
/// Calling [`unsubscribe`](Self::unsubscribe) stops all further handler
/// invocations caused by the subscription that produced it. It is
/// idempotent, and clones share the same underlying subscription.
/// Dropping the handle does NOT unsubscribe.
#[derive(Clone)]
pub struct Unsubscribe {
    inner: Rc<RefCell<Option<CleanupFn>>>,
}

impl Unsubscribe {
    /// Wrap a teardown function.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(Box::new(f)))),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self {
            inner: Rc::new(RefCell::new(None)),
        }
    }

    /// Combine several handles into one that releases all of them in order.
    pub fn all(parts: Vec<Unsubscribe>) -> Self {
        Self::new(move || {
            for part in parts {
                part.unsubscribe();
            }
        })
    }

    /// Release the subscription. Later calls do nothing.
    pub fn unsubscribe(&self) {
        // Take first so a re-entrant call sees the handle as closed
        let teardown = self.inner.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// True once the subscription has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    /// Convert into a cleanup callback.
    pub fn into_cleanup(self) -> CleanupFn {
        Box::new(move || self.unsubscribe())
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// CLEANUP LIST
// =============================================================================

/// Ordered set of teardown callbacks owned by an Event or a Reactive.
#[derive(Default)]
pub struct CleanupList {
    fns: RefCell<Vec<CleanupFn>>,
}

impl CleanupList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, f: CleanupFn) {
        self.fns.borrow_mut().push(f);
    }

    pub fn len(&self) -> usize {
        self.fns.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.borrow().is_empty()
    }

    /// Run and clear every callback in registration order.
    ///
    /// Callbacks registered while running are run too. A panicking
    /// callback is logged and does not stop the others.
    pub fn run_all(&self, site: &'static str) {
        loop {
            let batch: Vec<CleanupFn> = self.fns.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            for f in batch {
                isolate(site, f);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
