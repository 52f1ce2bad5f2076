// ============================================================================
// frp-core - Lifting
// Turn plain functions into functions over plain-or-reactive arguments
// ============================================================================
//
// A lifted function returns a plain value when every argument is plain and
// a Reactive when any argument is reactive. The reactive result recomputes
// on every change of any reactive argument, reading the current values of
// the others.
// ============================================================================

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::core::isolate::isolate;
use crate::core::types::Unsubscribe;
use crate::primitives::reactive::Reactive;

/// A lifted argument or result: either a plain value or a reactive one.
#[derive(Clone)]
pub enum Value<T> {
    Plain(T),
    Reactive(Reactive<T>),
}

impl<T: Clone + 'static> Value<T> {
    /// True for the `Reactive` variant.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Value::Reactive(_))
    }

    /// The current value, read from the reactive if there is one.
    pub fn current(&self) -> T {
        match self {
            Value::Plain(value) => value.clone(),
            Value::Reactive(reactive) => reactive.get(),
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive<T>> {
        match self {
            Value::Plain(_) => None,
            Value::Reactive(reactive) => Some(reactive),
        }
    }

    /// The plain value, or `None` for a reactive.
    pub fn into_plain(self) -> Option<T> {
        match self {
            Value::Plain(value) => Some(value),
            Value::Reactive(_) => None,
        }
    }

    /// Convert to a reactive, wrapping a plain value in [`Reactive::of`].
    pub fn into_reactive(self) -> Reactive<T> {
        match self {
            Value::Plain(value) => Reactive::of(value),
            Value::Reactive(reactive) => reactive,
        }
    }
}

impl<T> From<Reactive<T>> for Value<T> {
    fn from(reactive: Reactive<T>) -> Self {
        Value::Reactive(reactive)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Value::Reactive(reactive) => f.debug_tuple("Reactive").field(reactive).finish(),
        }
    }
}

/// A lifted n-ary function.
pub type Lifted<A, R> = Rc<dyn Fn(Vec<Value<A>>) -> Value<R>>;

/// Build the reactive result shared by every arity.
///
/// `compute` reads the current argument values; `sources` registers one
/// change listener per reactive argument. A panic in the first `compute`
/// propagates to the caller of the lifted function.
fn derive<R: Clone + 'static>(
    compute: Rc<dyn Fn() -> R>,
    sources: impl FnOnce(Rc<dyn Fn()>) -> Vec<Unsubscribe>,
) -> Reactive<R> {
    let result = Reactive::of(compute());
    let recompute: Rc<dyn Fn()> = {
        let result = result.clone();
        Rc::new(move || {
            if let Some(value) = isolate("lift", || compute()) {
                result.update_value_internal(value);
            }
        })
    };
    let subs = sources(recompute);
    result.on_cleanup(move || Unsubscribe::all(subs).unsubscribe());
    result
}

fn listen<T: Clone + 'static>(value: &Value<T>, recompute: &Rc<dyn Fn()>) -> Option<Unsubscribe> {
    let reactive = value.as_reactive()?;
    let recompute = recompute.clone();
    Some(reactive.subscribe_changes(Rc::new(move |_: T| recompute())))
}

/// Lift a unary function.
///
/// # Example
///
/// ```
/// use frp_core::{lift1, Reactive, Value};
///
/// let double = lift1(|x: i32| x * 2);
/// assert_eq!(double(Value::Plain(4)).current(), 8);
///
/// let r = Reactive::of(1);
/// let out = double(Value::from(r.clone()));
/// assert!(out.is_reactive());
/// ```
pub fn lift1<A, R>(f: impl Fn(A) -> R + 'static) -> impl Fn(Value<A>) -> Value<R>
where
    A: Clone + 'static,
    R: Clone + 'static,
{
    let f = Rc::new(f);
    move |a: Value<A>| match a {
        Value::Plain(a) => Value::Plain(f(a)),
        Value::Reactive(ra) => {
            let f = f.clone();
            Value::Reactive(ra.map(move |a| f(a)))
        }
    }
}

/// Lift a binary function.
pub fn lift2<A, B, R>(f: impl Fn(A, B) -> R + 'static) -> impl Fn(Value<A>, Value<B>) -> Value<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + 'static,
{
    let f = Rc::new(f);
    move |a: Value<A>, b: Value<B>| {
        if !a.is_reactive() && !b.is_reactive() {
            return Value::Plain(f(a.current(), b.current()));
        }

        let compute: Rc<dyn Fn() -> R> = {
            let (f, a, b) = (f.clone(), a.clone(), b.clone());
            Rc::new(move || f(a.current(), b.current()))
        };
        Value::Reactive(derive(compute, |recompute| {
            [listen(&a, &recompute), listen(&b, &recompute)]
                .into_iter()
                .flatten()
                .collect()
        }))
    }
}

/// Lift a ternary function.
pub fn lift3<A, B, C, R>(
    f: impl Fn(A, B, C) -> R + 'static,
) -> impl Fn(Value<A>, Value<B>, Value<C>) -> Value<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    R: Clone + 'static,
{
    let f = Rc::new(f);
    move |a: Value<A>, b: Value<B>, c: Value<C>| {
        if !a.is_reactive() && !b.is_reactive() && !c.is_reactive() {
            return Value::Plain(f(a.current(), b.current(), c.current()));
        }

        let compute: Rc<dyn Fn() -> R> = {
            let (f, a, b, c) = (f.clone(), a.clone(), b.clone(), c.clone());
            Rc::new(move || f(a.current(), b.current(), c.current()))
        };
        Value::Reactive(derive(compute, |recompute| {
            [
                listen(&a, &recompute),
                listen(&b, &recompute),
                listen(&c, &recompute),
            ]
            .into_iter()
            .flatten()
            .collect()
        }))
    }
}

/// Lift a function over any number of same-typed arguments.
///
/// # Example
///
/// ```
/// use frp_core::{lift, Reactive, Value};
///
/// let sum = lift(|xs: &[i32]| xs.iter().sum::<i32>());
/// let r = Reactive::of(10);
/// let total = sum(vec![Value::Plain(1), Value::from(r.clone()), Value::Plain(2)]);
/// assert_eq!(total.current(), 13);
/// ```
pub fn lift<A, R>(f: impl Fn(&[A]) -> R + 'static) -> Lifted<A, R>
where
    A: Clone + 'static,
    R: Clone + 'static,
{
    let f = Rc::new(f);
    Rc::new(move |args: Vec<Value<A>>| {
        if !args.iter().any(Value::is_reactive) {
            let values: Vec<A> = args.iter().map(Value::current).collect();
            return Value::Plain(f(&values));
        }

        let args = Rc::new(args);
        let compute: Rc<dyn Fn() -> R> = {
            let (f, args) = (f.clone(), args.clone());
            Rc::new(move || {
                let values: Vec<A> = args.iter().map(Value::current).collect();
                f(&values)
            })
        };
        Value::Reactive(derive(compute, |recompute| {
            args.iter().filter_map(|arg| listen(arg, &recompute)).collect()
        }))
    })
}

/// Lift every function in a map, keeping the keys.
pub fn lift_all<K, A, R>(fns: HashMap<K, Rc<dyn Fn(&[A]) -> R>>) -> HashMap<K, Lifted<A, R>>
where
    K: Eq + Hash,
    A: Clone + 'static,
    R: Clone + 'static,
{
    fns.into_iter()
        .map(|(key, f)| (key, lift(move |args: &[A]| f(args))))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
