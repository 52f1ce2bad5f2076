// ============================================================================
// frp-core - Reactivity Module
// Batch transactions and the host-driven scheduler
// ============================================================================

pub mod batching;
pub mod scheduling;

// Re-export batching functions
pub use batching::{batch, batch_depth, is_batching, schedule_update, try_batch, BatchHandler};

// Re-export scheduling functions
pub use scheduling::{
    advance_time, clear_timeout, now, pending_microtasks, pending_timers, queue_microtask,
    run_realtime_until_idle, run_until_idle, set_timeout, tick,
};
