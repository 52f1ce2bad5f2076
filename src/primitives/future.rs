// ============================================================================
// frp-core - Future
// A deferred, re-runnable subscription to a value source
// ============================================================================
//
// A Future is nothing but a subscribe function: hand it a handler, get back
// an Unsubscribe. Events are thin wrappers around one, and the bridges to
// Reactive live here too.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::isolate::isolate;
use crate::core::types::{Handler, Unsubscribe};
use crate::primitives::reactive::Reactive;

type RunFn<A> = Rc<dyn Fn(Handler<A>) -> Unsubscribe>;

/// A lazily started source of values.
///
/// Each [`run`](Self::run) is an independent subscription; nothing happens
/// until a handler is attached.
pub struct Future<A> {
    run_fn: RunFn<A>,
}

impl<A> Clone for Future<A> {
    fn clone(&self) -> Self {
        Self {
            run_fn: self.run_fn.clone(),
        }
    }
}

impl<A> fmt::Debug for Future<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future").finish_non_exhaustive()
    }
}

impl<A: Clone + 'static> Future<A> {
    /// Build a future from its subscribe function.
    pub fn new(run: impl Fn(Handler<A>) -> Unsubscribe + 'static) -> Self {
        Self {
            run_fn: Rc::new(run),
        }
    }

    /// Start a subscription.
    pub fn run(&self, handler: impl Fn(A) + 'static) -> Unsubscribe {
        self.run_handler(Rc::new(handler))
    }

    /// Start a subscription with a shared handler.
    ///
    /// The handler is gated so that nothing reaches it once the returned
    /// handle has been released, whatever the subscribe function does.
    pub fn run_handler(&self, handler: Handler<A>) -> Unsubscribe {
        let active = Rc::new(Cell::new(true));
        let gated: Handler<A> = {
            let active = active.clone();
            Rc::new(move |value: A| {
                if active.get() {
                    handler(value);
                }
            })
        };

        let inner = (self.run_fn)(gated);
        Unsubscribe::new(move || {
            active.set(false);
            inner.unsubscribe();
        })
    }

    /// Deliver `value` once, synchronously, on every run.
    pub fn of(value: A) -> Self {
        Self::new(move |handler| {
            handler(value.clone());
            Unsubscribe::noop()
        })
    }

    /// Never deliver anything.
    pub fn never() -> Self {
        Self::new(|_| Unsubscribe::noop())
    }

    /// Transform every delivered value.
    ///
    /// A panicking `f` drops that value.
    pub fn map<B: Clone + 'static>(&self, f: impl Fn(A) -> B + 'static) -> Future<B> {
        let source = self.clone();
        let f = Rc::new(f);
        Future::new(move |handler: Handler<B>| {
            let f = f.clone();
            source.run(move |a| {
                if let Some(b) = isolate("future map", || f(a)) {
                    handler(b);
                }
            })
        })
    }

    /// Replace every delivered value with a new future and forward its values.
    ///
    /// Exactly one inner subscription is live at a time: a new outer value
    /// releases the previous inner run before starting the next one.
    pub fn chain<B: Clone + 'static>(&self, f: impl Fn(A) -> Future<B> + 'static) -> Future<B> {
        let source = self.clone();
        let f = Rc::new(f);
        Future::new(move |handler: Handler<B>| {
            let current: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

            let outer = {
                let current = current.clone();
                let f = f.clone();
                source.run(move |a| {
                    let Some(next) = isolate("future chain", || f(a)) else {
                        return;
                    };
                    let previous = current.borrow_mut().take();
                    if let Some(previous) = previous {
                        previous.unsubscribe();
                    }
                    let sub = next.run_handler(handler.clone());
                    *current.borrow_mut() = Some(sub);
                })
            };

            Unsubscribe::new(move || {
                outer.unsubscribe();
                let inner = current.borrow_mut().take();
                if let Some(inner) = inner {
                    inner.unsubscribe();
                }
            })
        })
    }

    /// A future of every later value of `reactive`.
    ///
    /// The current value is not delivered. The reactive is held weakly, so a
    /// dropped or cleaned-up reactive simply stops producing.
    pub fn from_reactive(reactive: &Reactive<A>) -> Self {
        let weak = reactive.downgrade();
        Self::new(move |handler| match weak.upgrade() {
            Some(reactive) => reactive.subscribe_changes(handler),
            None => Unsubscribe::noop(),
        })
    }

    /// A future that delivers a fresh reactive on its first value.
    ///
    /// The reactive is created from the first value and then kept current
    /// by every later one; the handler sees it exactly once per run.
    pub fn into_reactive(&self) -> Future<Reactive<A>> {
        let source = self.clone();
        Future::new(move |handler: Handler<Reactive<A>>| {
            let slot: Rc<RefCell<Option<Reactive<A>>>> = Rc::new(RefCell::new(None));
            let sub = {
                let slot = slot.clone();
                source.run(move |a| {
                    let existing = slot.borrow().clone();
                    match existing {
                        Some(reactive) => reactive.update_value_internal(a),
                        None => {
                            let reactive = Reactive::of(a);
                            *slot.borrow_mut() = Some(reactive.clone());
                            handler(reactive);
                        }
                    }
                })
            };
            Unsubscribe::new(move || {
                sub.unsubscribe();
                slot.borrow_mut().take();
            })
        })
    }

    /// Hold the latest value in a reactive that starts at `initial`.
    ///
    /// The subscription ends when the reactive is cleaned up.
    pub fn hold(&self, initial: A) -> Reactive<A> {
        let reactive = Reactive::of(initial);
        let sub = {
            let target = reactive.clone();
            self.run(move |a| target.update_value_internal(a))
        };
        reactive.on_cleanup(move || sub.unsubscribe());
        reactive
    }
}

// =============================================================================
// TESTS
// =============================================================================
