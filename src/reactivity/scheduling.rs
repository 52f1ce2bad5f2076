// ============================================================================
// frp-core - Scheduling
// Microtask queue and virtual-clock timers driven by the host
// ============================================================================
//
// There is no ambient event loop in Rust, so the runtime owns one:
// - queue_microtask / tick: FIFO queue drained at the microtask boundary
// - set_timeout / clear_timeout: one-shot timers on a virtual ms clock
// - advance_time / run_until_idle: the host drives the clock forward
// Batch flushes ride on microtasks; debounce/throttle/interval on timers.
// ============================================================================

use std::time::Duration;

use crate::core::context::{with_context, TimerId};
use crate::core::isolate::isolate;

fn to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// MICROTASKS
// =============================================================================

/// Queue `f` to run at the next microtask boundary.
pub fn queue_microtask(f: impl FnOnce() + 'static) {
    with_context(|ctx| ctx.push_microtask(Box::new(f)));
}

/// Drain the microtask queue.
///
/// Tasks queued while draining run in the same call. This is the point at
/// which batched emissions are delivered.
///
/// # Example
///
/// ```
/// use frp_core::{batch, tick, Event};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let (ev, emit) = Event::create();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// ev.subscribe(move |v: i32| sink.borrow_mut().push(v));
///
/// batch(|| emit.emit(1));
/// assert!(seen.borrow().is_empty());
///
/// tick();
/// assert_eq!(*seen.borrow(), vec![1]);
/// ```
pub fn tick() {
    while let Some(task) = with_context(|ctx| ctx.pop_microtask()) {
        isolate("microtask", task);
    }
}

/// Number of microtasks waiting for the next `tick`.
pub fn pending_microtasks() -> usize {
    with_context(|ctx| ctx.microtask_count())
}

// =============================================================================
// TIMERS
// =============================================================================

/// Current time on the runtime's virtual clock.
pub fn now() -> Duration {
    Duration::from_millis(with_context(|ctx| ctx.now_ms()))
}

/// Run `f` once after `delay` has elapsed on the runtime clock.
pub fn set_timeout(delay: Duration, f: impl FnOnce() + 'static) -> TimerId {
    let delay_ms = to_millis(delay);
    let id = with_context(|ctx| ctx.add_timer(delay_ms, Box::new(f)));
    tracing::trace!(?id, delay_ms, "timer scheduled");
    id
}

/// Cancel a pending timer. Returns false if it already fired.
pub fn clear_timeout(id: TimerId) -> bool {
    with_context(|ctx| ctx.remove_timer(id))
}

/// Number of timers that have not fired or been cancelled.
pub fn pending_timers() -> usize {
    with_context(|ctx| ctx.timer_count())
}

/// Move the clock forward by `by`, firing every timer that comes due.
///
/// Timers fire in deadline order with the clock set to their deadline;
/// microtasks are drained before the first timer and after each one.
pub fn advance_time(by: Duration) {
    let target = with_context(|ctx| ctx.now_ms()).saturating_add(to_millis(by));
    tick();

    while let Some((deadline, task)) = with_context(|ctx| ctx.take_due_timer(target)) {
        with_context(|ctx| ctx.set_now_ms(deadline));
        isolate("timer", task);
        tick();
    }

    with_context(|ctx| ctx.set_now_ms(target));
}

/// Drain microtasks and fire timers until nothing is pending.
///
/// Jumps the virtual clock straight to each deadline. Never returns while a
/// repeating source such as `interval` is still live.
pub fn run_until_idle() {
    tick();
    while let Some(deadline) = with_context(|ctx| ctx.next_deadline()) {
        let now = with_context(|ctx| ctx.now_ms());
        advance_time(Duration::from_millis(deadline.saturating_sub(now)));
    }
}

/// Like [`run_until_idle`], but sleeps the thread until each deadline.
pub fn run_realtime_until_idle() {
    tick();
    while let Some(deadline) = with_context(|ctx| ctx.next_deadline()) {
        let now = with_context(|ctx| ctx.now_ms());
        let wait = Duration::from_millis(deadline.saturating_sub(now));
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        advance_time(wait);
    }
}

// =============================================================================
// TESTS
// =============================================================================
