// ============================================================================
// frp-core - Push-based Functional Reactive Programming for Rust
// ============================================================================
//
// Three primitives: Future (a deferred subscription), Event (discrete
// occurrences) and Reactive (a value that changes over time), plus batch
// transactions, lifting and a host-driven scheduler with a virtual clock.
//
// Everything is single-threaded: handles are Rc-based and all runtime
// state lives in a thread-local context.
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root for ergonomic access
pub use core::config::{config, configure, FrpConfig};
pub use core::constants;
pub use core::context::TimerId;
pub use core::error::FrpError;
pub use core::types::{CleanupFn, Func, Handler, Predicate, Unsubscribe};

// Re-export primitives at crate root
pub use primitives::event::{Emitter, Event};
pub use primitives::future::Future;
pub use primitives::lift::{lift, lift1, lift2, lift3, lift_all, Lifted, Value};
pub use primitives::map_each::{map_each_reactive, MapEachOptions};
pub use primitives::reactive::{is_reactive, IsReactive, Reactive, WeakReactive};
pub use primitives::switch::{concat_e, switch_b, switch_e};

// Re-export reactivity functions
pub use reactivity::batching::{batch, batch_depth, is_batching, schedule_update, try_batch};
pub use reactivity::scheduling::{
    advance_time, clear_timeout, now, pending_microtasks, pending_timers, queue_microtask,
    run_realtime_until_idle, run_until_idle, set_timeout, tick,
};

// =============================================================================
// TESTS
// =============================================================================
