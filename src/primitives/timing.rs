// ============================================================================
// frp-core - Timing Combinators
// debounce, throttle and interval on the runtime clock
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::core::config::config;
use crate::core::context::TimerId;
use crate::core::types::{Handler, Unsubscribe};
use crate::primitives::event::{Emitter, Event};
use crate::primitives::future::Future;
use crate::reactivity::scheduling::{clear_timeout, now, set_timeout};

struct DebounceState<A> {
    timer: Option<TimerId>,
    latest: Option<A>,
}

struct ThrottleState<A> {
    last_fire: Option<Duration>,
    timer: Option<TimerId>,
    latest: Option<A>,
}

impl<A: Clone + 'static> Event<A> {
    /// Emit the latest value once `period` passes with no new occurrence.
    ///
    /// `None` uses the configured default (249ms). Each subscription keeps
    /// its own timer, cancelled on unsubscribe.
    ///
    /// # Example
    ///
    /// ```
    /// use frp_core::{advance_time, Event};
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use std::time::Duration;
    ///
    /// let (typed, emit) = Event::<&str>::create();
    /// let settled = typed.debounce(Some(Duration::from_millis(100)));
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let sink = seen.clone();
    /// settled.subscribe(move |s| sink.borrow_mut().push(s));
    ///
    /// emit.emit("h");
    /// emit.emit("he");
    /// advance_time(Duration::from_millis(100));
    /// assert_eq!(*seen.borrow(), vec!["he"]);
    /// ```
    pub fn debounce(&self, period: Option<Duration>) -> Event<A> {
        let period = period.unwrap_or_else(|| config().default_debounce);
        let source = self.clone();

        Event::from_future(Future::new(move |handler: Handler<A>| {
            let state = Rc::new(RefCell::new(DebounceState {
                timer: None,
                latest: None,
            }));

            let sub = {
                let state = state.clone();
                source.subscribe(move |a| {
                    let previous = {
                        let mut s = state.borrow_mut();
                        s.latest = Some(a);
                        s.timer.take()
                    };
                    if let Some(timer) = previous {
                        clear_timeout(timer);
                    }

                    let fire = {
                        let state = state.clone();
                        let handler = handler.clone();
                        move || {
                            let value = {
                                let mut s = state.borrow_mut();
                                s.timer = None;
                                s.latest.take()
                            };
                            if let Some(value) = value {
                                handler(value);
                            }
                        }
                    };
                    let timer = set_timeout(period, fire);
                    state.borrow_mut().timer = Some(timer);
                })
            };

            Unsubscribe::new(move || {
                sub.unsubscribe();
                let timer = {
                    let mut s = state.borrow_mut();
                    s.latest = None;
                    s.timer.take()
                };
                if let Some(timer) = timer {
                    clear_timeout(timer);
                }
            })
        }))
    }

    /// Emit at most once per `window`.
    ///
    /// The first occurrence passes straight through. Occurrences inside the
    /// window are held and the latest one is emitted when the window closes.
    /// `None` uses the configured default (249ms).
    pub fn throttle(&self, window: Option<Duration>) -> Event<A> {
        let window = window.unwrap_or_else(|| config().default_throttle);
        let source = self.clone();

        Event::from_future(Future::new(move |handler: Handler<A>| {
            let state = Rc::new(RefCell::new(ThrottleState {
                last_fire: None,
                timer: None,
                latest: None,
            }));

            let sub = {
                let state = state.clone();
                source.subscribe(move |a| {
                    let at = now();
                    let mut s = state.borrow_mut();
                    let elapsed = s.last_fire.map(|last| at.saturating_sub(last));

                    match elapsed {
                        Some(elapsed) if elapsed < window => {
                            s.latest = Some(a);
                            if s.timer.is_some() {
                                return;
                            }
                            let trailing = {
                                let state = state.clone();
                                let handler = handler.clone();
                                move || {
                                    let value = {
                                        let mut s = state.borrow_mut();
                                        s.timer = None;
                                        let value = s.latest.take();
                                        if value.is_some() {
                                            s.last_fire = Some(now());
                                        }
                                        value
                                    };
                                    if let Some(value) = value {
                                        handler(value);
                                    }
                                }
                            };
                            s.timer = Some(set_timeout(window - elapsed, trailing));
                        }
                        _ => {
                            s.last_fire = Some(at);
                            s.latest = None;
                            drop(s);
                            handler(a);
                        }
                    }
                })
            };

            Unsubscribe::new(move || {
                sub.unsubscribe();
                let timer = {
                    let mut s = state.borrow_mut();
                    s.latest = None;
                    s.timer.take()
                };
                if let Some(timer) = timer {
                    clear_timeout(timer);
                }
            })
        }))
    }
}

impl Event<u64> {
    /// Emit 0, 1, 2, ... once every `period`, starting one period from now.
    ///
    /// Runs until the event is cleaned up. A zero period is treated as 1ms.
    pub fn interval(period: Duration) -> Event<u64> {
        let period = period.max(Duration::from_millis(1));
        let (event, emitter) = Event::create();

        let ticker = Rc::new(Ticker {
            period,
            emitter,
            count: Cell::new(0),
            timer: Cell::new(None),
            stopped: Cell::new(false),
        });
        Ticker::arm(&ticker);

        event.on_cleanup(move || {
            ticker.stopped.set(true);
            if let Some(timer) = ticker.timer.take() {
                clear_timeout(timer);
            }
        });
        event
    }
}

struct Ticker {
    period: Duration,
    emitter: Emitter<u64>,
    count: Cell<u64>,
    timer: Cell<Option<TimerId>>,
    stopped: Cell<bool>,
}

impl Ticker {
    fn arm(this: &Rc<Self>) {
        if this.stopped.get() {
            return;
        }
        let next = this.clone();
        let id = set_timeout(this.period, move || {
            next.timer.set(None);
            let n = next.count.get();
            next.count.set(n + 1);
            next.emitter.emit(n);
            Ticker::arm(&next);
        });
        this.timer.set(Some(id));
    }
}

// =============================================================================
// TESTS
// =============================================================================
