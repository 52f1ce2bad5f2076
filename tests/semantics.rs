use frp_core::{
    advance_time, batch, batch_depth, cloned, concat_e, is_batching, map_each_reactive, now,
    pending_timers, switch_b, switch_e, tick, try_batch, Event, MapEachOptions, Reactive,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn record<A: Clone + 'static>(ev: &Event<A>) -> Rc<RefCell<Vec<A>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    ev.subscribe(cloned!(seen => move |a| seen.borrow_mut().push(a)));
    seen
}

#[test]
fn test_zip_waits_for_both_sides() {
    let (left, emit_left) = Event::create();
    let (right, emit_right) = Event::create();
    let pairs = record(&left.zip(&right));

    emit_left.emit(1);
    emit_left.emit(2);
    emit_left.emit(3);
    assert!(pairs.borrow().is_empty());

    emit_right.emit("a");
    emit_right.emit("b");
    assert_eq!(*pairs.borrow(), vec![(1, "a"), (2, "b")]);
}

#[test]
fn test_zip_resubscribe_has_no_stale_values() {
    let (left, emit_left) = Event::create();
    let (right, emit_right) = Event::create();
    let zipped = left.zip(&right);

    let first = zipped.subscribe(|_: (i32, i32)| {});
    emit_left.emit(100);
    emit_left.emit(200);
    first.unsubscribe();

    let pairs = record(&zipped);
    emit_right.emit(1);
    assert!(pairs.borrow().is_empty());

    emit_left.emit(2);
    assert_eq!(*pairs.borrow(), vec![(2, 1)]);
}

#[test]
fn test_switch_e_stops_old_source_at_switch() {
    let (a, emit_a) = Event::create();
    let (b, emit_b) = Event::create();
    let (sources, switch_to) = Event::create();
    let out = record(&switch_e(&a, &sources));

    emit_a.emit("a1");
    emit_b.emit("b-before");
    switch_to.emit(b.clone());
    emit_a.emit("a2");
    emit_b.emit("b1");

    assert_eq!(*out.borrow(), vec!["a1", "b1"]);
}

#[test]
fn test_switch_b_current_value_jumps_immediately() {
    let (a_ev, set_a) = Event::create();
    let a = a_ev.stepper(1);
    let b = Reactive::of(50);
    let (sources, switch_to) = Event::create();

    let out = switch_b(&a, &sources);
    let seen = Rc::new(RefCell::new(Vec::new()));
    out.subscribe(cloned!(seen => move |v| seen.borrow_mut().push(v)));

    set_a.emit(2);
    switch_to.emit(b.clone());
    set_a.emit(3);

    assert_eq!(*seen.borrow(), vec![1, 2, 50]);
    assert_eq!(out.get(), 50);
}

#[test]
fn test_concat_e_follows_membership() {
    let (a, emit_a) = Event::create();
    let (b, emit_b) = Event::create();
    let (lists, set_list) = Event::create();
    let members = Reactive::create(vec![a.clone()], Some(&lists));

    let out = record(&concat_e(&members));
    emit_a.emit(1);

    set_list.emit(vec![a.clone(), b.clone()]);
    emit_a.emit(2);
    emit_b.emit(3);

    set_list.emit(vec![b.clone()]);
    emit_a.emit(4);
    emit_b.emit(5);

    assert_eq!(*out.borrow(), vec![1, 2, 3, 5]);
}

#[test]
fn test_debounce_single_output_after_quiet_period() {
    let start = now();
    let (ev, emit) = Event::create();
    let settled = ev.debounce(Some(ms(100)));
    let seen = Rc::new(RefCell::new(Vec::new()));
    settled.subscribe(cloned!(seen => move |v| seen.borrow_mut().push((now() - start, v))));

    emit.emit("t0");
    advance_time(ms(50));
    emit.emit("t50");
    advance_time(ms(40));
    emit.emit("t90");
    advance_time(ms(200));

    assert_eq!(*seen.borrow(), vec![(ms(190), "t90")]);
    assert_eq!(pending_timers(), 0);
}

#[test]
fn test_throttle_trailing_edge_fires_once() {
    let (ev, emit) = Event::create();
    let out = record(&ev.throttle(Some(ms(100))));

    for i in 0..5 {
        emit.emit(i);
        advance_time(ms(10));
    }
    advance_time(ms(100));

    assert_eq!(*out.borrow(), vec![0, 4]);
}

#[test]
fn test_map_each_keyed_reconciliation() {
    #[derive(Clone, PartialEq, Debug)]
    struct Item {
        id: u32,
        v: &'static str,
    }

    let (updates, set_items) = Event::create();
    let items = updates.stepper(vec![Item { id: 1, v: "a" }, Item { id: 2, v: "b" }]);

    let created = Rc::new(RefCell::new(Vec::new()));
    let disposed = Rc::new(RefCell::new(Vec::new()));
    let outputs = map_each_reactive(
        &items,
        cloned!(created => move |item: Reactive<Item>| {
            created.borrow_mut().push(item.get().id);
            item.map(|i| i.v.to_uppercase())
        }),
        MapEachOptions::new(|i: &Item| i.id)
            .is_equal(|a: &Item, b: &Item| a == b)
            .dispose(cloned!(disposed => move |out: Reactive<String>| disposed.borrow_mut().push(out.get()))),
    );

    let key2 = outputs.get()[1].clone();
    set_items.emit(vec![Item { id: 2, v: "b2" }, Item { id: 3, v: "c" }]);

    assert_eq!(*created.borrow(), vec![1, 2, 3]);
    assert_eq!(*disposed.borrow(), vec!["A".to_string()]);
    assert!(outputs.get()[0].ptr_eq(&key2));
    assert_eq!(key2.get(), "B2");

    let labels: Vec<String> = outputs.get().iter().map(|r| r.get()).collect();
    assert_eq!(labels, vec!["B2", "C"]);
}

#[test]
fn test_batch_flushes_each_emission_in_order() {
    let (ev, emit) = Event::create();
    let out = record(&ev);

    batch(|| {
        assert!(is_batching());
        emit.emit(1);
        emit.emit(2);
        emit.emit(3);
    });
    assert!(out.borrow().is_empty());

    tick();
    assert_eq!(*out.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_nested_try_batch_failure_keeps_enclosing_emissions() {
    let (ev, emit) = Event::create();
    let out = record(&ev);

    batch(|| {
        emit.emit("outer");
        let result: Result<(), &str> = try_batch(|| {
            emit.emit("rejected");
            Err("invalid")
        });
        assert_eq!(result, Err("invalid"));
        assert_eq!(batch_depth(), 1);
        emit.emit("after");
    });
    tick();

    assert_eq!(*out.borrow(), vec!["outer", "after"]);
}

#[test]
fn test_map_each_survives_failing_callbacks() {
    let (updates, set_items) = Event::create();
    let items = updates.stepper(vec![(1, 0), (2, 0)]);

    let created = Rc::new(Cell::new(0));
    let disposed = Rc::new(Cell::new(0));
    let outputs = map_each_reactive(
        &items,
        cloned!(created => move |item: Reactive<(u32, i32)>| {
            created.set(created.get() + 1);
            item.map(|(_, v)| v * 10)
        }),
        MapEachOptions::new(|&(id, _): &(u32, i32)| id)
            .is_equal(|a: &(u32, i32), b: &(u32, i32)| {
                if b.1 < 0 {
                    panic!("negative value");
                }
                a == b
            })
            .dispose(cloned!(disposed => move |_: Reactive<i32>| {
                disposed.set(disposed.get() + 1);
                panic!("dispose failed");
            })),
    );
    let first = outputs.get()[0].clone();

    set_items.emit(vec![(1, -1), (2, 0)]);
    assert_eq!(first.get(), -10);

    set_items.emit(vec![(1, 5), (2, 5)]);
    assert_eq!(created.get(), 2);
    assert_eq!(disposed.get(), 0);
    assert!(outputs.get()[0].ptr_eq(&first));
    assert_eq!(first.get(), 50);

    set_items.emit(vec![(1, 5)]);
    assert_eq!(disposed.get(), 1);
    assert_eq!(outputs.get().len(), 1);
}

#[test]
fn test_failing_subscriber_does_not_block_others() {
    let (ev, emit) = Event::create();
    ev.subscribe(|v: i32| {
        if v == 2 {
            panic!("intentional panic");
        }
    });
    let out = record(&ev);

    emit.emit(1);
    emit.emit(2);
    emit.emit(3);
    assert_eq!(*out.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_merge_transform_failure_is_isolated() {
    let (a, emit_a) = Event::create();
    let (b, emit_b) = Event::create();
    let merged = a.merge_with(
        &b,
        |x: i32| {
            if x < 0 {
                panic!("negative");
            }
            x
        },
        |s: &str| s.len() as i32,
    );
    let out = record(&merged);

    emit_a.emit(-1);
    emit_b.emit("four");
    emit_a.emit(7);
    assert_eq!(*out.borrow(), vec![4, 7]);
}

#[test]
fn test_interval_drives_fold() {
    let ticks = Event::interval(ms(20));
    let count = ticks.fold(0u64, |n, _| n + 1);
    let runs = Rc::new(Cell::new(0));
    count.subscribe(cloned!(runs => move |_| runs.set(runs.get() + 1)));

    advance_time(ms(100));
    assert_eq!(count.get(), 5);
    assert_eq!(runs.get(), 6);

    ticks.cleanup();
    advance_time(ms(100));
    assert_eq!(count.get(), 5);
}
