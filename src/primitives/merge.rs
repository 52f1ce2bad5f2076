// ============================================================================
// frp-core - Merging Events
// merge_with, concat, zip and friends
// ============================================================================
//
// All combinators here are lazy: nothing subscribes to the inputs until the
// result is subscribed, and per-subscription state (zip queues, batch
// slots) lives only as long as that subscription.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::core::error::FrpError;
use crate::core::isolate::isolate;
use crate::core::types::{Func, Handler, Unsubscribe};
use crate::primitives::event::Event;
use crate::primitives::future::Future;
use crate::reactivity::scheduling::queue_microtask;

impl<A: Clone + 'static> Event<A> {
    /// Merge two events of different types into one.
    ///
    /// Occurrences of `self` go through `f`, those of `other` through `g`.
    pub fn merge_with<B, C>(
        &self,
        other: &Event<B>,
        f: impl Fn(A) -> C + 'static,
        g: impl Fn(B) -> C + 'static,
    ) -> Event<C>
    where
        B: Clone + 'static,
        C: Clone + 'static,
    {
        let left = self.clone();
        let right = other.clone();
        let f = Rc::new(f);
        let g = Rc::new(g);

        Event::from_future(Future::new(move |handler: Handler<C>| {
            let on_left = {
                let handler = handler.clone();
                let f = f.clone();
                left.subscribe(move |a| {
                    if let Some(c) = isolate("merge_with", || f(a)) {
                        handler(c);
                    }
                })
            };
            let on_right = {
                let g = g.clone();
                right.subscribe(move |b| {
                    if let Some(c) = isolate("merge_with", || g(b)) {
                        handler(c);
                    }
                })
            };
            Unsubscribe::all(vec![on_left, on_right])
        }))
    }

    /// Occurrences of either event, in arrival order.
    pub fn concat(&self, other: &Event<A>) -> Event<A> {
        self.merge_with(other, |a| a, |a| a)
    }

    /// Occurrences of every event in `events`.
    pub fn concat_all(events: &[Event<A>]) -> Event<A> {
        match events {
            [] => Event::never(),
            [single] => single.clone(),
            [first, rest @ ..] => rest.iter().fold(first.clone(), |acc, ev| acc.concat(ev)),
        }
    }

    /// Merge several update-function events into one.
    pub fn unions(updates: &[Event<Func<A, A>>]) -> Event<Func<A, A>> {
        Event::concat_all(updates)
    }

    /// Pair the n-th occurrence of `self` with the n-th of `other`.
    ///
    /// Unmatched values wait in per-subscription queues that are dropped
    /// on unsubscribe, so a resubscriber starts with empty queues.
    pub fn zip<B: Clone + 'static>(&self, other: &Event<B>) -> Event<(A, B)> {
        let left = self.clone();
        let right = other.clone();

        Event::from_future(Future::new(move |handler: Handler<(A, B)>| {
            let lefts: Rc<RefCell<VecDeque<A>>> = Rc::new(RefCell::new(VecDeque::new()));
            let rights: Rc<RefCell<VecDeque<B>>> = Rc::new(RefCell::new(VecDeque::new()));

            let check: Rc<dyn Fn()> = {
                let lefts = lefts.clone();
                let rights = rights.clone();
                Rc::new(move || {
                    let pair = {
                        let mut l = lefts.borrow_mut();
                        let mut r = rights.borrow_mut();
                        if l.is_empty() || r.is_empty() {
                            None
                        } else {
                            l.pop_front().zip(r.pop_front())
                        }
                    };
                    if let Some(pair) = pair {
                        handler(pair);
                    }
                })
            };

            let on_left = {
                let lefts = lefts.clone();
                let check = check.clone();
                left.subscribe(move |a| {
                    lefts.borrow_mut().push_back(a);
                    check();
                })
            };
            let on_right = {
                let rights = rights.clone();
                right.subscribe(move |b| {
                    rights.borrow_mut().push_back(b);
                    check();
                })
            };

            Unsubscribe::new(move || {
                on_left.unsubscribe();
                on_right.unsubscribe();
                lefts.borrow_mut().clear();
                rights.borrow_mut().clear();
            })
        }))
    }

    /// Zip any number of same-typed events into vectors.
    ///
    /// Fails with [`FrpError::EmptyZip`] when `events` is empty.
    pub fn zip_all(events: &[Event<A>]) -> Result<Event<Vec<A>>, FrpError> {
        let (first, rest) = events.split_first().ok_or(FrpError::EmptyZip)?;
        let seed = first.map(|a| vec![a]);
        Ok(rest.iter().fold(seed, |acc, ev| {
            acc.zip(ev).map(|(mut values, next)| {
                values.push(next);
                values
            })
        }))
    }

    /// Pair the latest values of both events once per microtask.
    ///
    /// Values arriving in the same turn are combined; a side that saw no
    /// value yet holds the pair back until it does.
    pub fn batch_combine<B: Clone + 'static>(&self, other: &Event<B>) -> Event<(A, B)> {
        let left = self.clone();
        let right = other.clone();

        Event::from_future(Future::new(move |handler: Handler<(A, B)>| {
            let latest: Rc<RefCell<(Option<A>, Option<B>)>> = Rc::new(RefCell::new((None, None)));
            let scheduled = Rc::new(Cell::new(false));
            let closed = Rc::new(Cell::new(false));

            let schedule: Rc<dyn Fn()> = {
                let latest = latest.clone();
                let scheduled = scheduled.clone();
                let closed = closed.clone();
                Rc::new(move || {
                    if scheduled.replace(true) {
                        return;
                    }
                    let latest = latest.clone();
                    let scheduled = scheduled.clone();
                    let closed = closed.clone();
                    let handler = handler.clone();
                    queue_microtask(move || {
                        scheduled.set(false);
                        if closed.get() {
                            return;
                        }
                        let pair = {
                            let mut slots = latest.borrow_mut();
                            if slots.0.is_some() && slots.1.is_some() {
                                slots.0.take().zip(slots.1.take())
                            } else {
                                None
                            }
                        };
                        if let Some(pair) = pair {
                            handler(pair);
                        }
                    });
                })
            };

            let on_left = {
                let latest = latest.clone();
                let schedule = schedule.clone();
                left.subscribe(move |a| {
                    latest.borrow_mut().0 = Some(a);
                    schedule();
                })
            };
            let on_right = {
                let latest = latest.clone();
                right.subscribe(move |b| {
                    latest.borrow_mut().1 = Some(b);
                    schedule();
                })
            };

            Unsubscribe::new(move || {
                closed.set(true);
                on_left.unsubscribe();
                on_right.unsubscribe();
                *latest.borrow_mut() = (None, None);
            })
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::scheduling::tick;

    fn record<A: Clone + 'static>(ev: &Event<A>) -> (Rc<RefCell<Vec<A>>>, Unsubscribe) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = ev.subscribe(move |a| sink.borrow_mut().push(a));
        (seen, sub)
    }

    #[test]
    fn merge_with_maps_both_sides() {
        let (nums, emit_num) = Event::create();
        let (words, emit_word) = Event::create();
        let merged = nums.merge_with(&words, |n: i32| n.to_string(), |w: &'static str| w.to_uppercase());
        let (seen, _) = record(&merged);

        emit_num.emit(1);
        emit_word.emit("two");
        emit_num.emit(3);
        assert_eq!(*seen.borrow(), vec!["1", "TWO", "3"]);
    }

    #[test]
    fn concat_all_handles_empty_and_many() {
        let (seen, _) = record(&Event::<i32>::concat_all(&[]));
        assert!(seen.borrow().is_empty());

        let sources: Vec<(Event<i32>, _)> = (0..3).map(|_| Event::create()).collect();
        let events: Vec<Event<i32>> = sources.iter().map(|(ev, _)| ev.clone()).collect();
        let (seen, _) = record(&Event::concat_all(&events));

        sources[2].1.emit(2);
        sources[0].1.emit(0);
        sources[1].1.emit(1);
        assert_eq!(*seen.borrow(), vec![2, 0, 1]);
    }

    #[test]
    fn unions_merge_update_functions() {
        let (inc, emit_inc) = Event::<Func<i32, i32>>::create();
        let (dbl, emit_dbl) = Event::<Func<i32, i32>>::create();
        let state = Event::accum(1, &Event::unions(&[inc, dbl]));
        let (seen, _) = record(&state);

        emit_inc.emit(Rc::new(|x: i32| x + 1));
        emit_dbl.emit(Rc::new(|x: i32| x * 2));
        assert_eq!(*seen.borrow(), vec![2, 4]);
    }

    #[test]
    fn zip_pairs_in_order() {
        let (a, emit_a) = Event::create();
        let (b, emit_b) = Event::create();
        let (seen, _) = record(&a.zip(&b));

        emit_a.emit(1);
        emit_a.emit(2);
        emit_b.emit('x');
        emit_b.emit('y');
        emit_b.emit('z');
        emit_a.emit(3);
        assert_eq!(*seen.borrow(), vec![(1, 'x'), (2, 'y'), (3, 'z')]);
    }

    #[test]
    fn zip_resubscribe_starts_with_empty_queues() {
        let (a, emit_a) = Event::create();
        let (b, emit_b) = Event::create();
        let zipped = a.zip(&b);

        let (first, sub) = record(&zipped);
        emit_a.emit(1);
        sub.unsubscribe();

        let (second, _) = record(&zipped);
        emit_b.emit("b");
        emit_a.emit(2);

        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec![(2, "b")]);
    }

    #[test]
    fn zip_all_rejects_empty_input() {
        assert_eq!(Event::<i32>::zip_all(&[]).unwrap_err(), FrpError::EmptyZip);
    }

    #[test]
    fn zip_all_collects_one_from_each() {
        let sources: Vec<(Event<i32>, _)> = (0..3).map(|_| Event::create()).collect();
        let events: Vec<Event<i32>> = sources.iter().map(|(ev, _)| ev.clone()).collect();
        let (seen, _) = record(&Event::zip_all(&events).unwrap());

        sources[1].1.emit(20);
        sources[0].1.emit(10);
        assert!(seen.borrow().is_empty());
        sources[2].1.emit(30);
        assert_eq!(*seen.borrow(), vec![vec![10, 20, 30]]);
    }

    #[test]
    fn batch_combine_pairs_within_a_turn() {
        let (a, emit_a) = Event::create();
        let (b, emit_b) = Event::create();
        let (seen, _) = record(&a.batch_combine(&b));

        emit_a.emit(1);
        emit_a.emit(2);
        emit_b.emit("x");
        assert!(seen.borrow().is_empty());

        tick();
        assert_eq!(*seen.borrow(), vec![(2, "x")]);

        emit_a.emit(3);
        tick();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn batch_combine_unsubscribe_cancels_pending_pair() {
        let (a, emit_a) = Event::create();
        let (b, emit_b) = Event::create();
        let (seen, sub) = record(&a.batch_combine(&b));

        emit_a.emit(1);
        emit_b.emit(2);
        sub.unsubscribe();
        tick();
        assert!(seen.borrow().is_empty());
    }
}
