// ============================================================================
// frp-core - Reactive
// A continuously defined value: always has a current value and pushes changes
// ============================================================================
//
// Subscribers get the current value once on subscribe and every later
// update after that. No equality check is made: every update notifies.
// Notification walks a snapshot of the subscriber list, and each entry
// carries an `active` flag so a handler removed mid-notification is skipped.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::isolate::isolate;
use crate::core::types::{CleanupList, Func, Handler, Unsubscribe};
use crate::primitives::event::Event;
use crate::primitives::future::Future;

// =============================================================================
// INNER STATE
// =============================================================================

struct Subscriber<A> {
    id: u64,
    active: Rc<Cell<bool>>,
    handler: Handler<A>,
}

struct ReactiveInner<A> {
    value: RefCell<A>,
    subscribers: RefCell<Vec<Subscriber<A>>>,
    next_id: Cell<u64>,
    cleanups: CleanupList,
    change_event: RefCell<Option<Event<A>>>,
    disposed: Cell<bool>,
}

/// Marker for reactive handles.
pub trait IsReactive {}

// =============================================================================
// REACTIVE<A>
// =============================================================================

/// A value that changes over time.
///
/// Clones share the same underlying cell. Combinators hold their inputs
/// strongly; call [`cleanup`](Self::cleanup) on a derived reactive to
/// detach it from its sources.
///
/// # Example
///
/// ```
/// use frp_core::Reactive;
///
/// let base = Reactive::of(2);
/// let doubled = base.map(|x| x * 2);
/// assert_eq!(doubled.get(), 4);
/// ```
pub struct Reactive<A> {
    inner: Rc<ReactiveInner<A>>,
}

/// Non-owning handle to a [`Reactive`].
pub struct WeakReactive<A> {
    inner: Weak<ReactiveInner<A>>,
}

impl<A> Clone for Reactive<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> Clone for WeakReactive<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> WeakReactive<A> {
    pub fn upgrade(&self) -> Option<Reactive<A>> {
        self.inner.upgrade().map(|inner| Reactive { inner })
    }
}

impl<A> IsReactive for Reactive<A> {}

impl<A: fmt::Debug> fmt::Debug for Reactive<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<A> Reactive<A> {
    /// True if both handles point at the same reactive.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakReactive<A> {
        WeakReactive {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Register a callback to run when this reactive is cleaned up.
    ///
    /// Registering after cleanup runs the callback immediately.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            isolate("reactive cleanup", f);
            return;
        }
        self.inner.cleanups.push(Box::new(f));
    }
}

impl<A: Clone + 'static> Reactive<A> {
    /// A reactive holding `value` until something updates it.
    pub fn of(value: A) -> Self {
        Self {
            inner: Rc::new(ReactiveInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                cleanups: CleanupList::new(),
                change_event: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    /// A reactive starting at `initial` that follows `event` when given.
    ///
    /// The event subscription is released on cleanup.
    pub fn create(initial: A, event: Option<&Event<A>>) -> Self {
        let reactive = Self::of(initial);
        if let Some(event) = event {
            let target = reactive.clone();
            let sub = event.subscribe(move |a| target.update_value_internal(a));
            reactive.on_cleanup(move || sub.unsubscribe());
        }
        reactive
    }

    /// The current value.
    pub fn get(&self) -> A {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference.
    ///
    /// `f` must not update this reactive.
    pub fn with<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Receive the current value now and every later value.
    pub fn subscribe(&self, f: impl Fn(A) + 'static) -> Unsubscribe {
        if self.inner.disposed.get() {
            return Unsubscribe::noop();
        }
        let handler: Handler<A> = Rc::new(f);
        let sub = self.subscribe_changes(handler.clone());
        let current = self.get();
        isolate("reactive subscriber", || handler(current));
        sub
    }

    /// Receive every later value, without a replay of the current one.
    pub(crate) fn subscribe_changes(&self, handler: Handler<A>) -> Unsubscribe {
        if self.inner.disposed.get() {
            return Unsubscribe::noop();
        }
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let active = Rc::new(Cell::new(true));
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            active: active.clone(),
            handler,
        });

        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            active.set(false);
            if let Some(inner) = weak.upgrade() {
                inner.subscribers.borrow_mut().retain(|s| s.id != id);
            }
        })
    }

    /// Replace the value and notify every subscriber in registration order.
    ///
    /// Does nothing after cleanup. A panicking subscriber is logged and the
    /// rest are still notified.
    pub(crate) fn update_value_internal(&self, value: A) {
        if self.inner.disposed.get() {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();

        let snapshot: Vec<(Rc<Cell<bool>>, Handler<A>)> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|s| (s.active.clone(), s.handler.clone()))
            .collect();

        for (active, handler) in snapshot {
            if active.get() {
                let value = value.clone();
                isolate("reactive subscriber", || handler(value));
            }
        }
    }

    /// Forward every later value of `self` into `target`.
    pub(crate) fn mirror_into(&self, target: &Reactive<A>) -> Unsubscribe {
        let target = target.clone();
        self.subscribe_changes(Rc::new(move |a: A| target.update_value_internal(a)))
    }

    /// An event of every later value.
    ///
    /// The same event is returned on every call.
    pub fn changes(&self) -> Event<A> {
        let cached = self.inner.change_event.borrow().clone();
        if let Some(event) = cached {
            return event;
        }
        let event = Event::from_future(Future::from_reactive(self));
        *self.inner.change_event.borrow_mut() = Some(event.clone());
        event
    }

    /// Run cleanup callbacks and drop every subscriber. Idempotent.
    ///
    /// After cleanup the value is frozen and nothing is notified.
    pub fn cleanup(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        tracing::trace!("reactive cleanup");

        self.inner.cleanups.run_all("reactive cleanup");

        let subscribers: Vec<Subscriber<A>> = self.inner.subscribers.borrow_mut().drain(..).collect();
        for s in &subscribers {
            s.active.set(false);
        }
        drop(subscribers);

        let changes = self.inner.change_event.borrow_mut().take();
        if let Some(changes) = changes {
            changes.cleanup();
        }
    }

    // =========================================================================
    // COMBINATORS
    // =========================================================================

    /// Apply `f` to the current value and to every later value.
    pub fn map<B: Clone + 'static>(&self, f: impl Fn(A) -> B + 'static) -> Reactive<B> {
        let f: Func<A, B> = Rc::new(f);
        self.ap(&Reactive::of(f))
    }

    /// Apply a reactive function to this reactive value.
    ///
    /// Recomputes whenever either side changes. The initial value is
    /// computed eagerly and a panic there propagates to the caller, since
    /// there is no previous result to keep. A later panicking application
    /// keeps the previous result.
    pub fn ap<B: Clone + 'static>(&self, rf: &Reactive<Func<A, B>>) -> Reactive<B> {
        let initial = (rf.get())(self.get());
        let result = Reactive::of(initial);

        let on_value = {
            let rf = rf.clone();
            let result = result.clone();
            self.subscribe_changes(Rc::new(move |a: A| {
                let f = rf.get();
                if let Some(b) = isolate("reactive ap", || f(a)) {
                    result.update_value_internal(b);
                }
            }))
        };

        let on_fn = {
            let ra = self.clone();
            let result = result.clone();
            rf.subscribe_changes(Rc::new(move |f: Func<A, B>| {
                let a = ra.get();
                if let Some(b) = isolate("reactive ap", || f(a)) {
                    result.update_value_internal(b);
                }
            }))
        };

        result.on_cleanup(move || {
            on_value.unsubscribe();
            on_fn.unsubscribe();
        });
        result
    }

    /// Follow the reactive selected by `f` for the current value.
    ///
    /// When `self` changes, the previously selected inner reactive is
    /// released and the result jumps to the newly selected one. A panic in
    /// the first call to `f` propagates to the caller; later panics keep the
    /// current inner reactive.
    pub fn chain<B: Clone + 'static>(&self, f: impl Fn(A) -> Reactive<B> + 'static) -> Reactive<B> {
        let first = f(self.get());
        let result = Reactive::of(first.get());
        let inner_sub = Rc::new(RefCell::new(first.mirror_into(&result)));

        let outer_sub = {
            let result = result.clone();
            let inner_sub = inner_sub.clone();
            self.subscribe_changes(Rc::new(move |a: A| {
                let Some(next) = isolate("reactive chain", || f(a)) else {
                    return;
                };
                let previous = inner_sub.replace(Unsubscribe::noop());
                previous.unsubscribe();
                result.update_value_internal(next.get());
                let sub = next.mirror_into(&result);
                *inner_sub.borrow_mut() = sub;
            }))
        };

        result.on_cleanup(move || {
            outer_sub.unsubscribe();
            let inner = inner_sub.replace(Unsubscribe::noop());
            inner.unsubscribe();
        });
        result
    }
}

/// Compile-time check that `value` is a reactive handle.
///
/// Always returns `true`: the `IsReactive` bound does the checking. For a
/// runtime check on a plain-or-reactive argument use
/// [`Value::is_reactive`](crate::primitives::lift::Value::is_reactive).
pub fn is_reactive<T: IsReactive>(_value: &T) -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record<A: Clone + 'static>(r: &Reactive<A>) -> (Rc<RefCell<Vec<A>>>, Unsubscribe) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = r.subscribe(move |a| sink.borrow_mut().push(a));
        (seen, sub)
    }

    #[test]
    fn subscribe_replays_then_follows() {
        let r = Reactive::of(1);
        let (seen, _) = record(&r);
        r.update_value_internal(2);
        r.update_value_internal(2);
        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn unsubscribe_mid_notification_skips_handler() {
        let r = Reactive::of(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let second: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));
        let killer = second.clone();
        let _first = r.subscribe(move |v| {
            if v == 1 {
                let sub = killer.borrow_mut().take();
                if let Some(sub) = sub {
                    sub.unsubscribe();
                }
            }
        });
        let sink = seen.clone();
        *second.borrow_mut() = Some(r.subscribe(move |v| sink.borrow_mut().push(v)));

        r.update_value_internal(1);
        r.update_value_internal(2);
        assert_eq!(*seen.borrow(), vec![0]);
        assert_eq!(r.subscriber_count(), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let r = Reactive::of(0);
        r.subscribe(|v| {
            if v > 0 {
                panic!("intentional panic");
            }
        });
        let (seen, _) = record(&r);
        r.update_value_internal(3);
        assert_eq!(*seen.borrow(), vec![0, 3]);
    }

    #[test]
    fn cleanup_is_idempotent_and_freezes() {
        let r = Reactive::of(1);
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        r.on_cleanup(move || counter.set(counter.get() + 1));
        let (seen, _) = record(&r);

        r.cleanup();
        r.cleanup();
        r.update_value_internal(9);

        assert_eq!(runs.get(), 1);
        assert_eq!(r.get(), 1);
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(r.is_disposed());
        assert_eq!(r.subscriber_count(), 0);
    }

    #[test]
    fn map_follows_source() {
        let r = Reactive::of(3);
        let m = r.map(|x| x + 1);
        assert_eq!(m.get(), 4);
        r.update_value_internal(10);
        assert_eq!(m.get(), 11);
    }

    #[test]
    fn ap_recomputes_on_either_side() {
        let ra = Reactive::of(2);
        let add_one: Func<i32, i32> = Rc::new(|x: i32| x + 1);
        let rf = Reactive::of(add_one);
        let out = ra.ap(&rf);
        assert_eq!(out.get(), 3);

        ra.update_value_internal(5);
        assert_eq!(out.get(), 6);

        rf.update_value_internal(Rc::new(|x: i32| x * 100));
        assert_eq!(out.get(), 500);
    }

    #[test]
    fn ap_keeps_previous_result_on_panic() {
        let ra = Reactive::of(1);
        let out = ra.map(|x: i32| {
            if x < 0 {
                panic!("negative");
            }
            x * 2
        });
        ra.update_value_internal(-1);
        assert_eq!(out.get(), 2);
    }

    #[test]
    fn chain_switches_inner() {
        let selector = Reactive::of(false);
        let a = Reactive::of("a0");
        let b = Reactive::of("b0");
        let out = {
            let (a, b) = (a.clone(), b.clone());
            selector.chain(move |use_b| if use_b { b.clone() } else { a.clone() })
        };
        assert_eq!(out.get(), "a0");

        a.update_value_internal("a1");
        assert_eq!(out.get(), "a1");

        selector.update_value_internal(true);
        assert_eq!(out.get(), "b0");

        a.update_value_internal("a2");
        assert_eq!(out.get(), "b0");
        assert_eq!(a.subscriber_count(), 0);

        b.update_value_internal("b1");
        assert_eq!(out.get(), "b1");
    }

    #[test]
    fn derived_cleanup_detaches_from_source() {
        let r = Reactive::of(1);
        let m = r.map(|x| x * 2);
        assert_eq!(r.subscriber_count(), 1);
        m.cleanup();
        assert_eq!(r.subscriber_count(), 0);
    }

    #[test]
    fn changes_is_cached_and_skips_current() {
        let r = Reactive::of(1);
        let ev = r.changes();
        assert!(ev.ptr_eq(&r.changes()));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        ev.subscribe(move |v| sink.borrow_mut().push(v));
        r.update_value_internal(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    #[should_panic(expected = "no initial value")]
    fn initial_map_panic_reaches_caller() {
        let r = Reactive::of(0);
        let _ = r.map(|x: i32| -> i32 {
            if x == 0 {
                panic!("no initial value");
            }
            x
        });
    }

    #[test]
    fn later_map_panic_keeps_previous_value() {
        let r = Reactive::of(1);
        let m = r.map(|x: i32| 10 / x);
        r.update_value_internal(0);
        assert_eq!(m.get(), 10);
        r.update_value_internal(5);
        assert_eq!(m.get(), 2);
    }

    #[test]
    fn marker_check() {
        assert!(is_reactive(&Reactive::of(1)));
        assert!(!crate::primitives::lift::Value::Plain(1).is_reactive());
        assert!(crate::primitives::lift::Value::from(Reactive::of(1)).is_reactive());
    }
}
