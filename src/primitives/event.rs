// ============================================================================
// frp-core - Event
// Discrete occurrences over time, wrapped around a Future
// ============================================================================
//
// An event created with `Event::create` is backed by a push source that
// moves through three states:
//
//   Idle     no value yet; handlers subscribed so far wait in a pending list
//   Live     first emit seen; a Reactive carries every later value
//   Closed   the event was cleaned up; emits and subscribes do nothing
//
// Emitting before anyone subscribed is a no-op. Late subscribers only see
// values emitted after they subscribed.
//
// Derived events (map, filter, ...) are lazy: each subscription runs its
// own chain back to the source. Every subscription taken through
// `Event::subscribe` is tracked so `cleanup` can end them all.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::core::isolate::isolate;
use crate::core::types::{CleanupList, Func, Handler, Predicate, Unsubscribe};
use crate::primitives::future::Future;
use crate::primitives::reactive::Reactive;
use crate::reactivity::batching::{schedule_update, BatchHandler};

// =============================================================================
// PUSH SOURCE
// =============================================================================

enum SourceState<A> {
    Idle { pending: Vec<(u64, Handler<A>)> },
    Live(Reactive<A>),
    Closed,
}

struct PushSource<A> {
    state: RefCell<SourceState<A>>,
    next_id: Cell<u64>,
    /// Subscriptions moved from the pending list onto the reactive
    promoted: RefCell<HashMap<u64, Unsubscribe>>,
}

impl<A: Clone + 'static> PushSource<A> {
    fn new() -> Self {
        Self {
            state: RefCell::new(SourceState::Idle {
                pending: Vec::new(),
            }),
            next_id: Cell::new(0),
            promoted: RefCell::new(HashMap::new()),
        }
    }

    fn attach(self: &Rc<Self>, handler: Handler<A>) -> Unsubscribe {
        let live = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                SourceState::Closed => return Unsubscribe::noop(),
                SourceState::Live(reactive) => reactive.clone(),
                SourceState::Idle { pending } => {
                    let id = self.next_id.get();
                    self.next_id.set(id + 1);
                    pending.push((id, handler));

                    let source = self.clone();
                    return Unsubscribe::new(move || source.release(id));
                }
            }
        };
        live.subscribe_changes(handler)
    }

    fn release(&self, id: u64) {
        {
            let mut state = self.state.borrow_mut();
            if let SourceState::Idle { pending } = &mut *state {
                pending.retain(|(pid, _)| *pid != id);
                return;
            }
        }
        let promoted = self.promoted.borrow_mut().remove(&id);
        if let Some(sub) = promoted {
            sub.unsubscribe();
        }
    }

    fn deliver(&self, value: A) {
        let (live, pending) = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                SourceState::Closed => return,
                SourceState::Live(reactive) => (Some(reactive.clone()), Vec::new()),
                SourceState::Idle { pending } => (None, std::mem::take(pending)),
            }
        };

        if let Some(reactive) = live {
            reactive.update_value_internal(value);
            return;
        }
        if pending.is_empty() {
            tracing::trace!("emit with no subscribers dropped");
            return;
        }

        // First value: promote every waiting handler onto a fresh reactive
        let reactive = Reactive::of(value.clone());
        {
            let mut promoted = self.promoted.borrow_mut();
            for (id, handler) in &pending {
                promoted.insert(*id, reactive.subscribe_changes(handler.clone()));
            }
        }
        *self.state.borrow_mut() = SourceState::Live(reactive);

        for (id, handler) in pending {
            let still_subscribed = self
                .promoted
                .borrow()
                .get(&id)
                .is_some_and(|sub| !sub.is_closed());
            if still_subscribed {
                let value = value.clone();
                isolate("event subscriber", || handler(value));
            }
        }
    }

    fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.borrow_mut(), SourceState::Closed);
        self.promoted.borrow_mut().clear();
        if let SourceState::Live(reactive) = previous {
            reactive.cleanup();
        }
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// The push side of an event made by [`Event::create`].
pub struct Emitter<A> {
    source: Rc<PushSource<A>>,
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl<A: Clone + 'static> Emitter<A> {
    /// Push a value into the event.
    ///
    /// Delivered immediately outside a batch, at the end of the batch
    /// otherwise.
    pub fn emit(&self, value: A) {
        let source = self.source.clone();
        let action: BatchHandler = Rc::new(move || source.deliver(value.clone()));
        schedule_update(action);
    }
}

// =============================================================================
// EVENT<A>
// =============================================================================

struct EventInner<A> {
    future: Future<A>,
    cleanups: CleanupList,
    live: RefCell<Vec<Unsubscribe>>,
    stepper: RefCell<Option<(A, Reactive<A>)>>,
    disposed: Cell<bool>,
}

/// A stream of discrete occurrences.
///
/// # Example
///
/// ```
/// use frp_core::Event;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let (clicks, emit) = Event::create();
/// let labels = clicks.map(|n: u32| format!("click #{n}"));
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// labels.subscribe(move |s| sink.borrow_mut().push(s));
///
/// emit.emit(1);
/// emit.emit(2);
/// assert_eq!(*seen.borrow(), vec!["click #1", "click #2"]);
/// ```
pub struct Event<A> {
    inner: Rc<EventInner<A>>,
}

impl<A> Clone for Event<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("live_subscriptions", &self.inner.live.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<A> Event<A> {
    /// True if both handles point at the same event.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<A: Clone + 'static> Event<A> {
    /// Wrap a future.
    pub fn from_future(future: Future<A>) -> Self {
        Self {
            inner: Rc::new(EventInner {
                future,
                cleanups: CleanupList::new(),
                live: RefCell::new(Vec::new()),
                stepper: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    /// The underlying future.
    pub fn future(&self) -> &Future<A> {
        &self.inner.future
    }

    /// A new push-driven event and the emitter that feeds it.
    pub fn create() -> (Event<A>, Emitter<A>) {
        let source = Rc::new(PushSource::new());
        let event = {
            let source = source.clone();
            Event::from_future(Future::new(move |handler| source.attach(handler)))
        };
        {
            let source = source.clone();
            event.on_cleanup(move || source.close());
        }
        (event, Emitter { source })
    }

    /// An event that never occurs.
    pub fn never() -> Self {
        Self::from_future(Future::never())
    }

    /// Same as [`never`](Self::never).
    pub fn empty() -> Self {
        Self::never()
    }

    /// An event that delivers `value` to each subscriber once, on subscribe.
    pub fn of(value: A) -> Self {
        Self::from_future(Future::of(value))
    }

    /// Receive every later occurrence.
    pub fn subscribe(&self, f: impl Fn(A) + 'static) -> Unsubscribe {
        self.subscribe_handler(Rc::new(f))
    }

    pub(crate) fn subscribe_handler(&self, handler: Handler<A>) -> Unsubscribe {
        if self.inner.disposed.get() {
            return Unsubscribe::noop();
        }
        let Some(sub) = isolate("event subscribe", || self.inner.future.run_handler(handler)) else {
            return Unsubscribe::noop();
        };
        if self.inner.disposed.get() {
            // Cleaned up from inside a synchronous delivery
            sub.unsubscribe();
            return sub;
        }

        let mut live = self.inner.live.borrow_mut();
        live.retain(|u| !u.is_closed());
        live.push(sub.clone());
        sub
    }

    /// A future that subscribes through this event, so its cleanup applies.
    fn tracked(&self) -> Future<A> {
        let event = self.clone();
        Future::new(move |handler| event.subscribe_handler(handler))
    }

    /// Register a callback to run when this event is cleaned up.
    ///
    /// Registering after cleanup runs the callback immediately.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            isolate("event cleanup", f);
            return;
        }
        self.inner.cleanups.push(Box::new(f));
    }

    /// End every subscription and run cleanup callbacks. Idempotent.
    pub fn cleanup(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        tracing::trace!("event cleanup");

        let live: Vec<Unsubscribe> = self.inner.live.borrow_mut().drain(..).collect();
        for sub in live {
            sub.unsubscribe();
        }
        self.inner.cleanups.run_all("event cleanup");

        let stepper = self.inner.stepper.borrow_mut().take();
        if let Some((_, reactive)) = stepper {
            reactive.cleanup();
        }
    }

    // =========================================================================
    // TO REACTIVE
    // =========================================================================

    /// Hold the latest occurrence, starting from `initial`.
    ///
    /// Repeated calls with an equal initial value return the same reactive.
    pub fn stepper(&self, initial: A) -> Reactive<A>
    where
        A: PartialEq,
    {
        let cached = self.inner.stepper.borrow().clone();
        if let Some((init, reactive)) = cached {
            if init == initial {
                return reactive;
            }
        }
        let reactive = Reactive::create(initial.clone(), Some(self));
        *self.inner.stepper.borrow_mut() = Some((initial, reactive.clone()));
        reactive
    }

    /// Accumulate occurrences into a reactive, in arrival order.
    ///
    /// Starts listening immediately. A panicking reducer is logged and the
    /// accumulator keeps its previous value.
    pub fn fold<B: Clone + 'static>(&self, initial: B, f: impl Fn(B, A) -> B + 'static) -> Reactive<B> {
        let result = Reactive::of(initial);
        let sub = {
            let acc = result.clone();
            self.subscribe(move |a| {
                let current = acc.get();
                if let Some(next) = isolate("event fold", || f(current, a)) {
                    acc.update_value_internal(next);
                }
            })
        };
        result.on_cleanup(move || sub.unsubscribe());
        result
    }

    // =========================================================================
    // COMBINATORS
    // =========================================================================

    /// Transform every occurrence. A panicking `f` drops that occurrence.
    pub fn map<B: Clone + 'static>(&self, f: impl Fn(A) -> B + 'static) -> Event<B> {
        Event::from_future(self.tracked().map(f))
    }

    /// Keep occurrences for which `pred` holds.
    ///
    /// A panicking predicate drops that occurrence.
    pub fn filter(&self, pred: impl Fn(&A) -> bool + 'static) -> Event<A> {
        Event::from_future(self.tracked().chain(move |a| {
            match isolate("event filter", || pred(&a)) {
                Some(true) => Future::of(a),
                _ => Future::never(),
            }
        }))
    }

    /// Keep occurrences accepted by the predicate currently held in `rp`.
    pub fn filter_apply(&self, rp: &Reactive<Predicate<A>>) -> Event<A> {
        let rp = rp.clone();
        self.filter(move |a| (rp.get())(a))
    }

    /// Keep occurrences while `gate` is true.
    pub fn when(&self, gate: &Reactive<bool>) -> Event<A> {
        let gate = gate.clone();
        self.filter(move |_| gate.get())
    }

    /// Apply the function currently held in `rf` to every occurrence.
    pub fn apply<B: Clone + 'static>(&self, rf: &Reactive<Func<A, B>>) -> Event<B> {
        let rf = rf.clone();
        self.map(move |a| (rf.get())(a))
    }

    /// Sample `r` at every occurrence.
    pub fn tag<B: Clone + 'static>(&self, r: &Reactive<B>) -> Event<B> {
        let r = r.clone();
        self.map(move |_| r.get())
    }

    /// Running state driven by an event of functions.
    ///
    /// Each subscription starts from `initial` and emits the new state after
    /// applying every function that arrives.
    pub fn accum(initial: A, updates: &Event<Func<A, A>>) -> Event<A> {
        let updates = updates.clone();
        Event::from_future(Future::new(move |handler: Handler<A>| {
            let state = Rc::new(RefCell::new(initial.clone()));
            updates.subscribe(move |f: Func<A, A>| {
                let current = state.borrow().clone();
                if let Some(next) = isolate("event accum", || f(current)) {
                    *state.borrow_mut() = next.clone();
                    handler(next);
                }
            })
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
