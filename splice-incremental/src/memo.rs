//! Memoization combinators
//!
//! These sit on top of plain slots: each one claims a fixed number of slots
//! per call, so they can be used freely inside any incremental function.

use crate::memory::Memory;
use crate::run::{hooks, run_incremental, Run};
use hashbrown::HashMap;
use std::hash::Hash;
use tracing::trace;

impl<'t> Run<'t> {
    /// Recompute with `f` only when `key` differs from the previous run's key
    ///
    /// `f` is itself incremental: it runs against a private memory that
    /// persists across recomputations.
    pub fn memo<K, R>(&mut self, key: K, f: impl FnOnce(&mut Run<'_>) -> R) -> R
    where
        K: PartialEq + 'static,
        R: Clone + 'static,
    {
        self.memo_by(key, |a: &K, b: &K| a == b, f)
    }

    /// Like [`Run::memo`], with an explicit key comparison
    pub fn memo_by<K, R>(
        &mut self,
        key: K,
        eq: impl Fn(&K, &K) -> bool,
        f: impl FnOnce(&mut Run<'_>) -> R,
    ) -> R
    where
        K: 'static,
        R: Clone + 'static,
    {
        let memory = self.memory_slot();
        let cache = self.slot(|| None::<(K, R)>);

        if let Some((previous, result)) = &*cache.borrow() {
            if eq(previous, &key) {
                return result.clone();
            }
        }

        trace!(position = self.position(), "memo recompute");
        let result = run_incremental(&memory, f);
        cache.set(Some((key, result.clone())));
        result
    }

    /// Return the previous run's value instead of `value` when `eq` says
    /// they are the same, keeping downstream identity checks quiet
    pub fn dedupe<T>(&mut self, value: T, eq: impl Fn(&T, &T) -> bool) -> T
    where
        T: Clone + 'static,
    {
        let last = self.slot(|| None::<T>);
        let previous = last.borrow().clone();
        if let Some(old) = previous {
            if eq(&old, &value) {
                return old;
            }
        }
        last.set(Some(value.clone()));
        value
    }

    /// The value passed on the previous run (`init()` on the first run)
    pub fn previous<T: 'static>(&mut self, value: T, init: impl FnOnce() -> T) -> T {
        self.slot(init).replace(value)
    }
}

/// Wrap an incremental function so it only re-runs when its argument
/// changes
pub fn memoize<A, R, F>(f: F) -> impl Fn(&Memory, A) -> R
where
    A: PartialEq + Clone + 'static,
    R: Clone + 'static,
    F: Fn(&Memory, A) -> R,
{
    memoize_by(f, |a: &A, b: &A| a == b)
}

/// Like [`memoize`], with an explicit argument comparison
pub fn memoize_by<A, R, F, Q>(f: F, eq: Q) -> impl Fn(&Memory, A) -> R
where
    A: Clone + 'static,
    R: Clone + 'static,
    F: Fn(&Memory, A) -> R,
    Q: Fn(&A, &A) -> bool,
{
    hooks(move |run, args: A| {
        let memory = run.memory_slot();
        let cache = run.slot(|| None::<(A, R)>);

        if let Some((previous, result)) = &*cache.borrow() {
            if eq(previous, &args) {
                return result.clone();
            }
        }

        let result = f(&memory, args.clone());
        cache.set(Some((args, result.clone())));
        result
    })
}

/// Cache every result of `f` by argument, forever
///
/// Meant to be bound to a memory with [`Run::shared_incr`] so that many
/// calls share one cache without one memory per key.
pub fn memoize_forever<A, R, F>(f: F) -> impl Fn(&Memory, A) -> R
where
    A: Hash + Eq + Clone + 'static,
    R: Clone + 'static,
    F: Fn(A) -> R,
{
    hooks(move |run, arg: A| {
        let cache = run.slot(HashMap::<A, R>::new);
        if let Some(hit) = cache.borrow().get(&arg) {
            return hit.clone();
        }
        let value = f(arg.clone());
        cache.borrow_mut().insert(arg, value.clone());
        value
    })
}
