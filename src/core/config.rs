// ============================================================================
// frp-core - Runtime Configuration
// Per-thread tunables for timing combinators and the batch scheduler
// ============================================================================

use std::time::Duration;

use super::constants::{DEFAULT_DEBOUNCE, DEFAULT_THROTTLE, MAX_BATCH_DEPTH};
use super::context::with_context;
use super::error::FrpError;

// =============================================================================
// FRP CONFIG
// =============================================================================

/// Tunables read by the combinators of the current thread.
///
/// # Example
///
/// ```
/// use frp_core::{config, configure, FrpConfig};
/// use std::time::Duration;
///
/// configure(FrpConfig::default().with_default_debounce(Duration::from_millis(50))).unwrap();
/// assert_eq!(config().default_debounce, Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrpConfig {
    /// Quiet period for `debounce(ev, None)`.
    pub default_debounce: Duration,

    /// Window for `throttle(ev, None)`.
    pub default_throttle: Duration,

    /// Nesting depth past which `batch` logs a runaway-recursion error.
    pub max_batch_depth: usize,
}

impl Default for FrpConfig {
    fn default() -> Self {
        Self {
            default_debounce: DEFAULT_DEBOUNCE,
            default_throttle: DEFAULT_THROTTLE,
            max_batch_depth: MAX_BATCH_DEPTH,
        }
    }
}

impl FrpConfig {
    /// Set the default debounce quiet period.
    pub fn with_default_debounce(mut self, period: Duration) -> Self {
        self.default_debounce = period;
        self
    }

    /// Set the default throttle window.
    pub fn with_default_throttle(mut self, window: Duration) -> Self {
        self.default_throttle = window;
        self
    }

    /// Set the maximum batch nesting depth.
    pub fn with_max_batch_depth(mut self, depth: usize) -> Self {
        self.max_batch_depth = depth;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), FrpError> {
        if self.max_batch_depth == 0 {
            return Err(FrpError::InvalidConfig("max_batch_depth must be non-zero"));
        }
        Ok(())
    }
}

/// Install `config` for the current thread.
pub fn configure(config: FrpConfig) -> Result<(), FrpError> {
    config.validate()?;
    with_context(|ctx| ctx.set_config(config));
    tracing::debug!(?config, "frp configuration installed");
    Ok(())
}

/// The configuration active on the current thread.
pub fn config() -> FrpConfig {
    with_context(|ctx| ctx.config())
}

// =============================================================================
// TESTS
// =============================================================================
