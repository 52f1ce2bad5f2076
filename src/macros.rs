// ============================================================================
// frp-core - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Handles are `Rc`-based, so wiring a graph means cloning them into every
/// closure that outlives the current scope.
///
/// # Usage
///
/// ```rust
/// use frp_core::{cloned, Event, Reactive};
///
/// let (ev, emit) = Event::create();
/// let offset = Reactive::of(10);
///
/// let shifted = ev.map(cloned!(offset => move |x: i32| x + offset.get()));
/// let latest = shifted.stepper(0);
///
/// emit.emit(1);
/// assert_eq!(latest.get(), 11);
/// assert_eq!(offset.get(), 10);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
