// ============================================================================
// frp-core - Keyed List Mapping
// Map a reactive list item by item, reusing work for items that stay put
// ============================================================================
//
// Every item gets its own Reactive<T>, keyed by a user-supplied function.
// On each list change:
// - new keys: a fresh item reactive is made and `map_fn` runs once
// - kept keys: the item reactive is updated in place (if changed)
// - gone keys: the item reactive is cleaned up and `dispose` runs
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::core::isolate::isolate;
use crate::primitives::reactive::Reactive;

type KeyFn<T, K> = Rc<dyn Fn(&T) -> K>;
type EqFn<T> = Rc<dyn Fn(&T, &T) -> bool>;
type DisposeFn<U> = Rc<dyn Fn(U)>;

/// Options for [`map_each_reactive`].
pub struct MapEachOptions<T, K, U> {
    key: KeyFn<T, K>,
    is_equal: Option<EqFn<T>>,
    dispose: Option<DisposeFn<U>>,
}

impl<T, K, U> Clone for MapEachOptions<T, K, U> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            is_equal: self.is_equal.clone(),
            dispose: self.dispose.clone(),
        }
    }
}

impl<T, K, U> MapEachOptions<T, K, U> {
    /// Identify items by `key`.
    ///
    /// An item whose key function panics is left out of that snapshot.
    pub fn new(key: impl Fn(&T) -> K + 'static) -> Self {
        Self {
            key: Rc::new(key),
            is_equal: None,
            dispose: None,
        }
    }

    /// Skip the in-place update when `is_equal(old, new)` holds.
    ///
    /// Without it, every kept item is updated on every list change. A
    /// panicking comparison counts as a change.
    pub fn is_equal(mut self, f: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.is_equal = Some(Rc::new(f));
        self
    }

    /// Run `f` on the output of each removed item.
    pub fn dispose(mut self, f: impl Fn(U) + 'static) -> Self {
        self.dispose = Some(Rc::new(f));
        self
    }
}

struct Entry<T, U> {
    item: Reactive<T>,
    output: U,
}

struct Mapper<T, K, U> {
    options: MapEachOptions<T, K, U>,
    map_fn: Rc<dyn Fn(Reactive<T>) -> U>,
    entries: RefCell<HashMap<K, Entry<T, U>>>,
}

impl<T, K, U> Mapper<T, K, U>
where
    T: Clone + 'static,
    K: Eq + Hash + 'static,
    U: Clone + 'static,
{
    fn reconcile(&self, items: Vec<T>) -> Vec<U> {
        let mut previous = std::mem::take(&mut *self.entries.borrow_mut());
        let mut next: HashMap<K, Entry<T, U>> = HashMap::with_capacity(items.len());
        let mut outputs = Vec::with_capacity(items.len());
        let mut updates: Vec<(Reactive<T>, T)> = Vec::new();

        for item in items {
            let key_fn = self.options.key.clone();
            let Some(key) = isolate("map_each key", || key_fn(&item)) else {
                continue;
            };
            if next.contains_key(&key) {
                tracing::warn!("duplicate key in map_each_reactive; keeping the first item");
                continue;
            }

            match previous.remove(&key) {
                Some(entry) => {
                    let changed = match &self.options.is_equal {
                        Some(eq) => {
                            let current = entry.item.get();
                            isolate("map_each is_equal", || eq(&current, &item)) != Some(true)
                        }
                        None => true,
                    };
                    if changed {
                        updates.push((entry.item.clone(), item));
                    }
                    outputs.push(entry.output.clone());
                    next.insert(key, entry);
                }
                None => {
                    let item = Reactive::of(item);
                    let map_fn = self.map_fn.clone();
                    let arg = item.clone();
                    let Some(output) = isolate("map_each", move || map_fn(arg)) else {
                        item.cleanup();
                        continue;
                    };
                    outputs.push(output.clone());
                    next.insert(key, Entry { item, output });
                }
            }
        }

        *self.entries.borrow_mut() = next;

        for (_, entry) in previous {
            self.release(entry);
        }
        for (item, value) in updates {
            item.update_value_internal(value);
        }
        outputs
    }

    fn release(&self, entry: Entry<T, U>) {
        entry.item.cleanup();
        if let Some(dispose) = &self.options.dispose {
            let output = entry.output;
            isolate("map_each dispose", || dispose(output));
        }
    }

    fn release_all(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for (_, entry) in entries {
            self.release(entry);
        }
    }
}

/// Map each item of `list` through `map_fn`, keeping per-key state.
///
/// `map_fn` receives a reactive view of one item and runs once per key for
/// as long as that key stays in the list. Cleaning up the result releases
/// every item.
///
/// # Example
///
/// ```
/// use frp_core::{map_each_reactive, MapEachOptions, Reactive};
///
/// let names = Reactive::of(vec!["ada", "grace"]);
/// let lengths = map_each_reactive(
///     &names,
///     |name| name.map(|n| n.len()),
///     MapEachOptions::new(|n: &&str| n.to_string()),
/// );
/// let current: Vec<usize> = lengths.get().iter().map(|r| r.get()).collect();
/// assert_eq!(current, vec![3, 5]);
/// ```
pub fn map_each_reactive<T, K, U>(
    list: &Reactive<Vec<T>>,
    map_fn: impl Fn(Reactive<T>) -> U + 'static,
    options: MapEachOptions<T, K, U>,
) -> Reactive<Vec<U>>
where
    T: Clone + 'static,
    K: Eq + Hash + 'static,
    U: Clone + 'static,
{
    let mapper = Rc::new(Mapper {
        options,
        map_fn: Rc::new(map_fn),
        entries: RefCell::new(HashMap::new()),
    });

    let result = Reactive::of(mapper.reconcile(list.get()));
    let sub = {
        let mapper = mapper.clone();
        let result = result.clone();
        list.subscribe_changes(Rc::new(move |items: Vec<T>| {
            let outputs = mapper.reconcile(items);
            result.update_value_internal(outputs);
        }))
    };

    result.on_cleanup(move || {
        sub.unsubscribe();
        mapper.release_all();
    });
    result
}

// =============================================================================
// TESTS
// =============================================================================
