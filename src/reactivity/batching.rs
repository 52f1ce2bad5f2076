// ============================================================================
// frp-core - Batching
// Coalesce the notifications raised during a block into one flush
// ============================================================================
//
// Batch transactions live on an explicit per-thread stack. The outermost
// `batch` opens a context, nested calls only bump its depth, and when the
// outermost call returns a single microtask is queued to flush everything
// scheduled inside it.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::context::with_context;
use crate::core::isolate::isolate;
use crate::reactivity::scheduling::queue_microtask;

/// A deferred notification, deduplicated by identity.
pub type BatchHandler = Rc<dyn Fn()>;

// =============================================================================
// BATCH CONTEXT
// =============================================================================

/// One open batch transaction.
pub struct BatchContext {
    /// Handlers to run at flush, in first-scheduled order
    pending: RefCell<Vec<BatchHandler>>,

    /// Nesting depth (1 for the outermost call)
    depth: Cell<usize>,
}

impl BatchContext {
    fn new() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            depth: Cell::new(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Queue `handler` unless the same handler is already queued
    fn schedule(&self, handler: BatchHandler) {
        let ptr = Rc::as_ptr(&handler) as *const ();
        let mut pending = self.pending.borrow_mut();
        if !pending.iter().any(|h| Rc::as_ptr(h) as *const () == ptr) {
            pending.push(handler);
        }
    }

    /// Drop handlers queued after the first `mark` entries
    fn discard_from(&self, mark: usize) -> usize {
        let mut pending = self.pending.borrow_mut();
        let discarded = pending.len().saturating_sub(mark);
        pending.truncate(mark);
        discarded
    }

    /// Drop pending work and reset the depth
    fn reset(&self) {
        self.pending.borrow_mut().clear();
        self.depth.set(0);
    }

    fn flush(&self) {
        let handlers: Vec<BatchHandler> = self.pending.borrow_mut().drain(..).collect();
        tracing::trace!(handlers = handlers.len(), "flushing batch");

        for handler in handlers {
            isolate("batched handler", || handler());
        }
        self.depth.set(0);
    }
}

// =============================================================================
// BATCH
// =============================================================================

/// Run `f` as one transaction, deferring emissions to the next microtask.
///
/// Emissions made inside `f` are collected and delivered together when the
/// microtask queue is next drained (see [`crate::tick`]). Nested calls run
/// inline and share the outermost call's flush. A panic inside `f` discards
/// the pending emissions and keeps unwinding.
///
/// # Example
///
/// ```
/// use frp_core::{batch, tick, Event};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let (ev, emit) = Event::create();
/// let total = ev.fold(0, |acc, v: i32| acc + v);
/// let runs = Rc::new(Cell::new(0));
/// let counter = runs.clone();
/// total.subscribe(move |_| counter.set(counter.get() + 1));
///
/// // Subscribing replays the current value once
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     emit.emit(10);
///     batch(|| emit.emit(20));
/// });
/// assert_eq!(total.get(), 0);
///
/// tick();
/// assert_eq!(total.get(), 30);
/// assert_eq!(runs.get(), 3);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    if let Some(active) = with_context(|ctx| ctx.active_batch()) {
        return run_nested(active, f);
    }

    let context = Rc::new(BatchContext::new());
    with_context(|ctx| ctx.push_batch(context.clone()));

    // Use a guard pattern to ensure we close the batch even on panic
    struct BatchGuard {
        context: Rc<BatchContext>,
    }

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.pop_batch());

            if std::thread::panicking() {
                tracing::warn!(
                    discarded = self.context.pending_count(),
                    "batch aborted by panic; pending handlers discarded"
                );
                self.context.reset();
            } else {
                let context = self.context.clone();
                queue_microtask(move || context.flush());
            }
        }
    }

    let _guard = BatchGuard { context };
    f()
}

fn run_nested<T>(active: Rc<BatchContext>, f: impl FnOnce() -> T) -> T {
    let depth = active.depth.get() + 1;
    active.depth.set(depth);

    let max = with_context(|ctx| ctx.config().max_batch_depth);
    if depth > max {
        tracing::error!(depth, max, "maximum batch depth exceeded; possible infinite loop");
    }

    struct DepthGuard {
        context: Rc<BatchContext>,
    }

    impl Drop for DepthGuard {
        fn drop(&mut self) {
            let depth = self.context.depth.get();
            self.context.depth.set(depth.saturating_sub(1));
        }
    }

    let _guard = DepthGuard { context: active };
    f()
}

/// Fallible form of [`batch`].
///
/// If `f` returns `Err`, everything `f` scheduled is discarded and the error
/// is handed back to the caller. Work scheduled by an enclosing batch before
/// this call is kept.
///
/// # Example
///
/// ```
/// use frp_core::{try_batch, tick, Event};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let (ev, emit) = Event::create();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// ev.subscribe(move |v: i32| sink.borrow_mut().push(v));
///
/// let result: Result<(), &str> = try_batch(|| {
///     emit.emit(1);
///     Err("validation failed")
/// });
/// tick();
///
/// assert_eq!(result, Err("validation failed"));
/// assert!(seen.borrow().is_empty());
/// ```
pub fn try_batch<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let mut mark: Option<(Rc<BatchContext>, usize)> = None;
    let result = batch(|| {
        mark = with_context(|ctx| ctx.active_batch()).map(|context| {
            let start = context.pending_count();
            (context, start)
        });
        f()
    });

    if result.is_err() {
        if let Some((context, start)) = mark {
            let discarded = context.discard_from(start);
            tracing::debug!(discarded, "batch failed; pending handlers discarded");
        }
    }
    result
}

/// Run `handler` now, or at the end of the active batch.
///
/// Inside a batch the same `Rc` handler only runs once per flush.
pub fn schedule_update(handler: BatchHandler) {
    match with_context(|ctx| ctx.active_batch()) {
        Some(context) => context.schedule(handler),
        None => handler(),
    }
}

/// Check if currently inside a batch.
///
/// # Example
///
/// ```
/// use frp_core::{batch, is_batching};
///
/// assert!(!is_batching());
///
/// batch(|| {
///     assert!(is_batching());
/// });
///
/// assert!(!is_batching());
/// ```
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

/// Depth of the active batch, or 0 outside a batch.
pub fn batch_depth() -> usize {
    with_context(|ctx| ctx.active_batch()).map_or(0, |context| context.depth())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{configure, FrpConfig};
    use crate::reactivity::scheduling::{pending_microtasks, tick};

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> BatchHandler) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |label: &'static str| -> BatchHandler {
                let log = log.clone();
                Rc::new(move || log.borrow_mut().push(label))
            }
        };
        (log, make)
    }

    #[test]
    fn schedule_update_runs_immediately_outside_batch() {
        let (log, make) = recorder();
        schedule_update(make("now"));
        assert_eq!(*log.borrow(), vec!["now"]);
        assert_eq!(pending_microtasks(), 0);
    }

    #[test]
    fn batch_defers_until_microtask_boundary() {
        let (log, make) = recorder();

        batch(|| {
            schedule_update(make("a"));
            schedule_update(make("b"));
            assert!(log.borrow().is_empty());
        });

        // Still deferred after the batch returns
        assert!(log.borrow().is_empty());
        assert_eq!(pending_microtasks(), 1);

        tick();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn batch_returns_value() {
        assert_eq!(batch(|| 42), 42);
        assert_eq!(batch(|| String::from("hello")), "hello");
        tick();
    }

    #[test]
    fn same_handler_runs_once_per_flush() {
        let (log, make) = recorder();
        let handler = make("once");

        batch(|| {
            schedule_update(handler.clone());
            schedule_update(handler.clone());
            schedule_update(make("other"));
        });
        tick();

        assert_eq!(*log.borrow(), vec!["once", "other"]);
    }

    #[test]
    fn nested_batches_share_one_flush() {
        let (log, make) = recorder();

        batch(|| {
            assert_eq!(batch_depth(), 1);
            schedule_update(make("outer"));

            batch(|| {
                assert_eq!(batch_depth(), 2);
                schedule_update(make("inner"));
            });

            assert_eq!(batch_depth(), 1);
            assert!(log.borrow().is_empty());
        });

        assert_eq!(batch_depth(), 0);
        assert_eq!(pending_microtasks(), 1);
        tick();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn is_batching_flag() {
        assert!(!is_batching());

        batch(|| {
            assert!(is_batching());

            batch(|| {
                assert!(is_batching());
            });

            assert!(is_batching());
        });

        assert!(!is_batching());
        tick();
    }

    #[test]
    fn handlers_scheduled_during_flush_run_immediately() {
        let (log, make) = recorder();
        let late = make("late");
        let first: BatchHandler = {
            let log = log.clone();
            Rc::new(move || {
                log.borrow_mut().push("first");
                schedule_update(late.clone());
            })
        };

        batch(|| schedule_update(first.clone()));
        tick();
        assert_eq!(*log.borrow(), vec!["first", "late"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_flush() {
        let (log, make) = recorder();

        batch(|| {
            schedule_update(Rc::new(|| panic!("intentional panic")));
            schedule_update(make("survivor"));
        });
        tick();

        assert_eq!(*log.borrow(), vec!["survivor"]);
    }

    #[test]
    fn batch_panic_safety() {
        let (log, make) = recorder();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            batch(|| {
                schedule_update(make("lost"));
                panic!("intentional panic");
            });
        }));

        assert!(result.is_err());
        // BatchGuard should have cleaned up - no longer in batch
        assert!(!is_batching());
        assert_eq!(pending_microtasks(), 0);

        tick();
        assert!(log.borrow().is_empty());

        // Scheduling works normally afterwards
        schedule_update(make("after"));
        assert_eq!(*log.borrow(), vec!["after"]);
    }

    #[test]
    fn try_batch_discards_on_error() {
        let (log, make) = recorder();

        let result: Result<(), String> = try_batch(|| {
            schedule_update(make("dropped"));
            Err(String::from("nope"))
        });
        tick();

        assert_eq!(result, Err(String::from("nope")));
        assert!(log.borrow().is_empty());
        assert!(!is_batching());
    }

    #[test]
    fn nested_try_batch_error_keeps_outer_work() {
        let (log, make) = recorder();

        batch(|| {
            schedule_update(make("outer"));
            let result: Result<(), ()> = try_batch(|| {
                assert_eq!(batch_depth(), 2);
                schedule_update(make("inner"));
                Err(())
            });
            assert!(result.is_err());
            assert_eq!(batch_depth(), 1);
            schedule_update(make("after"));
        });
        tick();

        assert_eq!(*log.borrow(), vec!["outer", "after"]);
        assert_eq!(batch_depth(), 0);
    }

    #[test]
    fn try_batch_flushes_on_success() {
        let (log, make) = recorder();

        let result: Result<i32, ()> = try_batch(|| {
            schedule_update(make("kept"));
            Ok(7)
        });
        tick();

        assert_eq!(result, Ok(7));
        assert_eq!(*log.borrow(), vec!["kept"]);
    }

    #[test]
    fn depth_overflow_is_logged_not_fatal() {
        configure(FrpConfig::default().with_max_batch_depth(2)).unwrap();

        let value = batch(|| batch(|| batch(|| batch(|| 5))));
        assert_eq!(value, 5);
        assert!(!is_batching());
        tick();
    }
}
