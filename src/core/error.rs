// ============================================================================
// frp-core - Errors
// ============================================================================

use thiserror::Error;

/// Errors returned by fallible FRP constructors.
///
/// Failures inside user callbacks are not errors: they are isolated, logged
/// and treated as "no occurrence" (see [`crate::core::isolate`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrpError {
    /// `zip_all` needs at least one source event.
    #[error("zip_all requires at least one event")]
    EmptyZip,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
