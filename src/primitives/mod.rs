// ============================================================================
// frp-core - Primitives Module
// Future, Event, Reactive and the combinators built on them
// ============================================================================

pub mod event;
pub mod future;
pub mod lift;
pub mod map_each;
pub mod merge;
pub mod reactive;
pub mod switch;
pub mod timing;

// Re-export for convenience
pub use event::{Emitter, Event};
pub use future::Future;
pub use lift::{lift, lift1, lift2, lift3, lift_all, Lifted, Value};
pub use map_each::{map_each_reactive, MapEachOptions};
pub use reactive::{is_reactive, IsReactive, Reactive, WeakReactive};
pub use switch::{concat_e, switch_b, switch_e};
