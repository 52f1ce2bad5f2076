// ============================================================================
// frp-core - Switching
// Dynamic re-wiring: follow whichever event or reactive is current
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::types::{Handler, Unsubscribe};
use crate::primitives::event::{Emitter, Event};
use crate::primitives::future::Future;
use crate::primitives::reactive::Reactive;

fn forward<A: Clone + 'static>(emitter: &Emitter<A>) -> impl Fn(A) + 'static {
    let emitter = emitter.clone();
    move |a| emitter.emit(a)
}

/// Follow the latest event delivered by `events`, starting with `initial`.
///
/// On each switch the previous event is unsubscribed and cleaned up before
/// the new one is subscribed, so no occurrence of the old event is seen
/// afterwards. Cleaning up the result releases the current event and
/// `events` too.
///
/// # Example
///
/// ```
/// use frp_core::{switch_e, Event};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let (first, emit_first) = Event::create();
/// let (second, emit_second) = Event::create();
/// let (switches, switch_to) = Event::create();
///
/// let current = switch_e(&first, &switches);
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// current.subscribe(move |v: i32| sink.borrow_mut().push(v));
///
/// emit_first.emit(1);
/// switch_to.emit(second.clone());
/// emit_first.emit(2);
/// emit_second.emit(3);
/// assert_eq!(*seen.borrow(), vec![1, 3]);
/// ```
pub fn switch_e<A: Clone + 'static>(initial: &Event<A>, events: &Event<Event<A>>) -> Event<A> {
    let (result, emitter) = Event::create();

    let current = Rc::new(RefCell::new((
        initial.clone(),
        initial.subscribe(forward(&emitter)),
    )));

    let on_switch = {
        let current = current.clone();
        let emitter = emitter.clone();
        events.subscribe(move |next: Event<A>| {
            let (previous, previous_sub) = current.borrow().clone();
            if previous.ptr_eq(&next) {
                return;
            }
            previous_sub.unsubscribe();
            previous.cleanup();

            let sub = next.subscribe(forward(&emitter));
            *current.borrow_mut() = (next, sub);
            tracing::trace!("switch_e moved to a new event");
        })
    };

    let events = events.clone();
    result.on_cleanup(move || {
        on_switch.unsubscribe();
        events.cleanup();
        let (event, sub) = current.borrow().clone();
        sub.unsubscribe();
        event.cleanup();
    });
    result
}

/// Follow the latest reactive delivered by `reactives`, starting with
/// `initial`.
///
/// Replaced reactives are unsubscribed but not cleaned up; they may still
/// be in use elsewhere.
pub fn switch_b<A: Clone + 'static>(initial: &Reactive<A>, reactives: &Event<Reactive<A>>) -> Reactive<A> {
    let result = Reactive::of(initial.get());
    let current = Rc::new(RefCell::new(initial.mirror_into(&result)));

    let on_switch = {
        let result = result.clone();
        let current = current.clone();
        reactives.subscribe(move |next: Reactive<A>| {
            let previous = current.replace(Unsubscribe::noop());
            previous.unsubscribe();
            result.update_value_internal(next.get());
            let sub = next.mirror_into(&result);
            *current.borrow_mut() = sub;
        })
    };

    result.on_cleanup(move || {
        on_switch.unsubscribe();
        let sub = current.replace(Unsubscribe::noop());
        sub.unsubscribe();
    });
    result
}

/// Occurrences of every event in the list currently held by `events`.
///
/// When the list changes, every old subscription is released and the new
/// list is subscribed in full.
pub fn concat_e<A: Clone + 'static>(events: &Reactive<Vec<Event<A>>>) -> Event<A> {
    let list = events.clone();

    Event::from_future(Future::new(move |handler: Handler<A>| {
        let subs: Rc<RefCell<Vec<Unsubscribe>>> = Rc::new(RefCell::new(Vec::new()));

        let attach: Rc<dyn Fn(Vec<Event<A>>)> = {
            let subs = subs.clone();
            Rc::new(move |events: Vec<Event<A>>| {
                let old: Vec<Unsubscribe> = subs.borrow_mut().drain(..).collect();
                for sub in old {
                    sub.unsubscribe();
                }
                let fresh: Vec<Unsubscribe> = events
                    .iter()
                    .map(|ev| ev.subscribe_handler(handler.clone()))
                    .collect();
                *subs.borrow_mut() = fresh;
            })
        };

        attach(list.get());
        let on_list = list.subscribe_changes(Rc::new(move |events: Vec<Event<A>>| attach(events)));

        Unsubscribe::new(move || {
            on_list.unsubscribe();
            let old: Vec<Unsubscribe> = subs.borrow_mut().drain(..).collect();
            for sub in old {
                sub.unsubscribe();
            }
        })
    }))
}

// =============================================================================
// TESTS
// =============================================================================
