// ============================================================================
// frp-core - Constants
// Defaults for timing combinators and the batch scheduler
// ============================================================================

use std::time::Duration;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Quiet period used by `debounce` when no explicit duration is given.
pub const DEFAULT_DEBOUNCE_MS: u64 = 249;

/// Window used by `throttle` when no explicit duration is given.
pub const DEFAULT_THROTTLE_MS: u64 = 249;

/// `DEFAULT_DEBOUNCE_MS` as a `Duration`.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);

/// `DEFAULT_THROTTLE_MS` as a `Duration`.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(DEFAULT_THROTTLE_MS);

// =============================================================================
// BATCHING
// =============================================================================

/// Nesting depth past which `batch` reports a probable runaway recursion.
pub const MAX_BATCH_DEPTH: usize = 100_000;

// =============================================================================
// TESTS
// =============================================================================
