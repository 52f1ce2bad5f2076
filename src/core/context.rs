// ============================================================================
// frp-core - Runtime Context
// Thread-local state for batching, microtasks and the virtual clock
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use super::config::FrpConfig;
use crate::reactivity::batching::BatchContext;

/// A queued unit of work (microtask or timer callback).
pub type Task = Box<dyn FnOnce()>;

/// Handle to a pending timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

// =============================================================================
// RUNTIME CONTEXT
// =============================================================================

/// Thread-local runtime holding all global state of the FRP engine.
///
/// Every accessor keeps its borrow local to the call. Callers take tasks
/// out first and run them afterwards, so user code never runs while a
/// borrow on this context is held.
pub struct RuntimeContext {
    // =========================================================================
    // CONFIGURATION
    // =========================================================================
    config: Cell<FrpConfig>,

    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Open batch transactions, outermost first
    batch_stack: RefCell<Vec<Rc<BatchContext>>>,

    // =========================================================================
    // MICROTASKS
    // =========================================================================
    microtasks: RefCell<VecDeque<Task>>,

    // =========================================================================
    // TIMERS (virtual clock)
    // =========================================================================
    /// Milliseconds elapsed on the virtual clock
    clock_ms: Cell<u64>,

    /// Next id handed out by `add_timer`; doubles as FIFO tiebreak
    next_timer_id: Cell<u64>,

    /// Pending timers keyed by (deadline, id)
    timers: RefCell<BTreeMap<(u64, TimerId), Task>>,

    /// Deadline lookup for cancellation
    deadlines: RefCell<HashMap<TimerId, u64>>,
}

impl RuntimeContext {
    /// Create a new runtime context with default values
    pub fn new() -> Self {
        Self {
            config: Cell::new(FrpConfig::default()),
            batch_stack: RefCell::new(Vec::new()),
            microtasks: RefCell::new(VecDeque::new()),
            clock_ms: Cell::new(0),
            next_timer_id: Cell::new(0),
            timers: RefCell::new(BTreeMap::new()),
            deadlines: RefCell::new(HashMap::new()),
        }
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    pub fn config(&self) -> FrpConfig {
        self.config.get()
    }

    pub fn set_config(&self, config: FrpConfig) {
        self.config.set(config);
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// The innermost open batch, if any
    pub fn active_batch(&self) -> Option<Rc<BatchContext>> {
        self.batch_stack.borrow().last().cloned()
    }

    pub fn push_batch(&self, batch: Rc<BatchContext>) {
        self.batch_stack.borrow_mut().push(batch);
    }

    pub fn pop_batch(&self) -> Option<Rc<BatchContext>> {
        self.batch_stack.borrow_mut().pop()
    }

    pub fn is_batching(&self) -> bool {
        !self.batch_stack.borrow().is_empty()
    }

    // =========================================================================
    // MICROTASKS
    // =========================================================================

    pub fn push_microtask(&self, task: Task) {
        self.microtasks.borrow_mut().push_back(task);
    }

    pub fn pop_microtask(&self) -> Option<Task> {
        self.microtasks.borrow_mut().pop_front()
    }

    pub fn microtask_count(&self) -> usize {
        self.microtasks.borrow().len()
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    pub fn now_ms(&self) -> u64 {
        self.clock_ms.get()
    }

    /// Move the clock forward. The clock never runs backwards.
    pub fn set_now_ms(&self, ms: u64) {
        if ms > self.clock_ms.get() {
            self.clock_ms.set(ms);
        }
    }

    /// Register `task` to run once the clock reaches now + `delay_ms`
    pub fn add_timer(&self, delay_ms: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_timer_id.get());
        self.next_timer_id.set(id.0 + 1);

        let deadline = self.clock_ms.get().saturating_add(delay_ms);
        self.timers.borrow_mut().insert((deadline, id), task);
        self.deadlines.borrow_mut().insert(id, deadline);
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn remove_timer(&self, id: TimerId) -> bool {
        let deadline = self.deadlines.borrow_mut().remove(&id);
        match deadline {
            Some(deadline) => self.timers.borrow_mut().remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.borrow().keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer if its deadline is at or before `limit_ms`
    pub fn take_due_timer(&self, limit_ms: u64) -> Option<(u64, Task)> {
        let key = {
            let timers = self.timers.borrow();
            match timers.keys().next() {
                Some(&(deadline, id)) if deadline <= limit_ms => (deadline, id),
                _ => return None,
            }
        };

        self.deadlines.borrow_mut().remove(&key.1);
        self.timers
            .borrow_mut()
            .remove(&key)
            .map(|task| (key.0, task))
    }

    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local runtime context
    static CONTEXT: RuntimeContext = RuntimeContext::new();
}

/// Access the thread-local runtime context.
///
/// Do not call back into user code from inside `f`.
pub fn with_context<R>(f: impl FnOnce(&RuntimeContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// TESTS
// =============================================================================
