// ============================================================================
// frp-core - Core Module
// Shared handle types, runtime context, configuration and errors
// ============================================================================

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod isolate;
pub mod types;

// Re-export commonly used items
pub use config::{config, configure, FrpConfig};
pub use context::{with_context, RuntimeContext, TimerId};
pub use error::FrpError;
pub use isolate::isolate;
pub use types::{CleanupFn, CleanupList, Func, Handler, Predicate, Unsubscribe};
