//! The eager promise container
//!
//! An [`EagerPromise`] settles at most once. Continuations attached to a
//! settled promise run immediately, on the caller's stack; continuations
//! attached to a pending promise run on the settling caller's stack, in
//! attachment order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::task::Waker;

type Callback<T, E> = Box<dyn FnOnce(Result<T, E>)>;

pub(crate) enum State<T, E> {
    Pending {
        callbacks: Vec<Callback<T, E>>,
        wakers: Vec<Waker>,
        /// Set once the promise has adopted another promise; later
        /// resolve/reject calls are ignored.
        locked: bool,
    },
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn pending() -> Self {
        State::Pending {
            callbacks: Vec::new(),
            wakers: Vec::new(),
            locked: false,
        }
    }
}

/// Snapshot of a promise's state, for synchronous inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseState<T, E> {
    /// Not settled yet
    Pending,
    /// Settled with a value
    Fulfilled(T),
    /// Settled with a reason
    Rejected(E),
}

impl<T, E> PromiseState<T, E> {
    /// `"pending"`, `"fulfilled"` or `"rejected"`
    pub fn status(&self) -> &'static str {
        match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        }
    }

    /// Whether the promise had not settled when the snapshot was taken
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }

    /// The value, if fulfilled
    pub fn value(&self) -> Option<&T> {
        match self {
            PromiseState::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    /// The reason, if rejected
    pub fn reason(&self) -> Option<&E> {
        match self {
            PromiseState::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A single-threaded promise that never defers to a scheduler
///
/// Cloning is cheap and preserves identity: clones observe the same
/// settlement, and [`EagerPromise::ptr_eq`] reports them as the same promise.
pub struct EagerPromise<T, E> {
    pub(crate) inner: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Clone for EagerPromise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// The settling half of a pending [`EagerPromise`]
///
/// The first call to `resolve`, `reject` or `adopt` decides the outcome;
/// later calls are ignored.
pub struct Resolver<T, E> {
    inner: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Resolver<T, E> {
    /// Fulfil the promise with `value`
    pub fn resolve(&self, value: T) {
        if self.accepts() {
            self.settle(Ok(value));
        }
    }

    /// Reject the promise with `reason`
    pub fn reject(&self, reason: E) {
        if self.accepts() {
            self.settle(Err(reason));
        }
    }

    /// Fulfil or reject according to `result`
    pub fn settle_with(&self, result: Result<T, E>) {
        if self.accepts() {
            self.settle(result);
        }
    }

    /// Follow another promise's eventual state.
    ///
    /// If `other` is already settled this settles immediately.
    pub fn adopt(&self, other: &EagerPromise<T, E>) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            panic!("an eager promise cannot adopt itself");
        }
        if !self.accepts() {
            return;
        }
        if let State::Pending { locked, .. } = &mut *self.inner.borrow_mut() {
            *locked = true;
        }
        let resolver = self.clone();
        other.on_settled(move |result| resolver.settle(result));
    }

    fn accepts(&self) -> bool {
        matches!(
            &*self.inner.borrow(),
            State::Pending { locked: false, .. }
        )
    }

    fn settle(&self, result: Result<T, E>) {
        let (callbacks, wakers) = {
            let mut state = self.inner.borrow_mut();
            if !matches!(&*state, State::Pending { .. }) {
                return;
            }
            let settled = match &result {
                Ok(value) => State::Fulfilled(value.clone()),
                Err(reason) => State::Rejected(reason.clone()),
            };
            match std::mem::replace(&mut *state, settled) {
                State::Pending {
                    callbacks, wakers, ..
                } => (callbacks, wakers),
                _ => return,
            }
        };

        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            callback(result.clone());
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> EagerPromise<T, E> {
    /// Create a promise and hand its resolver to `executor` right away
    pub fn new(executor: impl FnOnce(Resolver<T, E>)) -> Self {
        let (promise, resolver) = Self::pending();
        executor(resolver);
        promise
    }

    /// Create a pending promise together with the handle that settles it
    pub fn pending() -> (Self, Resolver<T, E>) {
        let inner = Rc::new(RefCell::new(State::pending()));
        (
            Self {
                inner: inner.clone(),
            },
            Resolver { inner },
        )
    }

    /// An already fulfilled promise
    pub fn resolve(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(State::Fulfilled(value))),
        }
    }

    /// An already rejected promise
    pub fn reject(reason: E) -> Self {
        Self {
            inner: Rc::new(RefCell::new(State::Rejected(reason))),
        }
    }

    /// An already settled promise matching `result`
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::resolve(value),
            Err(reason) => Self::reject(reason),
        }
    }

    /// Run `f` now and capture its result as a settled promise
    pub fn try_run(f: impl FnOnce() -> Result<T, E>) -> Self {
        Self::from_result(f())
    }

    /// Like [`EagerPromise::try_run`], for closures that produce a promise
    pub fn try_adopt(f: impl FnOnce() -> Result<EagerPromise<T, E>, E>) -> Self {
        match f() {
            Ok(promise) => promise,
            Err(reason) => Self::reject(reason),
        }
    }

    /// Wait for every promise, keeping input order.
    ///
    /// Rejects with the first rejection to settle. An empty input is
    /// fulfilled immediately.
    pub fn all(promises: impl IntoIterator<Item = EagerPromise<T, E>>) -> EagerPromise<Vec<T>, E> {
        let promises: Vec<_> = promises.into_iter().collect();
        if promises.is_empty() {
            return EagerPromise::resolve(Vec::new());
        }

        let (all, resolver) = EagerPromise::pending();
        let values: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; promises.len()]));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.into_iter().enumerate() {
            let values = values.clone();
            let remaining = remaining.clone();
            let resolver = resolver.clone();
            promise.on_settled(move |result| match result {
                Ok(value) => {
                    values.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let collected = values.borrow_mut().drain(..).flatten().collect();
                        resolver.resolve(collected);
                    }
                }
                Err(reason) => resolver.reject(reason),
            });
        }

        all
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PromiseState<T, E> {
        match self.settled() {
            None => PromiseState::Pending,
            Some(Ok(value)) => PromiseState::Fulfilled(value),
            Some(Err(reason)) => PromiseState::Rejected(reason),
        }
    }

    /// Whether the promise has not settled yet
    pub fn is_pending(&self) -> bool {
        self.settled().is_none()
    }

    /// Whether both handles point at the same promise
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn settled(&self) -> Option<Result<T, E>> {
        match &*self.inner.borrow() {
            State::Pending { .. } => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// Register a raw continuation.
    ///
    /// Runs before this call returns when the promise is already settled.
    pub fn on_settled(&self, f: impl FnOnce(Result<T, E>) + 'static) {
        match self.settled() {
            Some(result) => f(result),
            None => {
                if let State::Pending { callbacks, .. } = &mut *self.inner.borrow_mut() {
                    callbacks.push(Box::new(f));
                }
            }
        }
    }

    /// Chain on both outcomes; the returned promise adopts whatever the
    /// chosen handler returns.
    pub fn then<U, F, G>(&self, on_fulfilled: F, on_rejected: G) -> EagerPromise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> EagerPromise<U, E> + 'static,
        G: FnOnce(E) -> EagerPromise<U, E> + 'static,
    {
        let (next, resolver) = EagerPromise::pending();
        self.on_settled(move |result| {
            let chosen = match result {
                Ok(value) => on_fulfilled(value),
                Err(reason) => on_rejected(reason),
            };
            resolver.adopt(&chosen);
        });
        next
    }

    /// Chain on fulfilment; rejections pass through
    pub fn and_then<U, F>(&self, f: F) -> EagerPromise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> EagerPromise<U, E> + 'static,
    {
        self.then(f, EagerPromise::reject)
    }

    /// Recover from a rejection; values pass through
    pub fn or_else<G>(&self, f: G) -> EagerPromise<T, E>
    where
        G: FnOnce(E) -> EagerPromise<T, E> + 'static,
    {
        self.then(EagerPromise::resolve, f)
    }

    /// Transform the value
    pub fn map<U, F>(&self, f: F) -> EagerPromise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        let (next, resolver) = EagerPromise::pending();
        self.on_settled(move |result| resolver.settle_with(result.map(f)));
        next
    }

    /// Map with a fallible function; an `Err` rejects the returned promise
    pub fn try_map<U, F>(&self, f: F) -> EagerPromise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        let (next, resolver) = EagerPromise::pending();
        self.on_settled(move |result| resolver.settle_with(result.and_then(f)));
        next
    }

    /// Transform the rejection reason
    pub fn map_err<E2, F>(&self, f: F) -> EagerPromise<T, E2>
    where
        E2: Clone + 'static,
        F: FnOnce(E) -> E2 + 'static,
    {
        let (next, resolver) = EagerPromise::pending();
        self.on_settled(move |result| resolver.settle_with(result.map_err(f)));
        next
    }
}

impl<T: Clone + fmt::Debug + 'static, E: Clone + fmt::Debug + 'static> fmt::Debug
    for EagerPromise<T, E>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            PromiseState::Pending => write!(f, "EagerPromise(<pending>)"),
            PromiseState::Fulfilled(value) => write!(f, "EagerPromise(Fulfilled({:?}))", value),
            PromiseState::Rejected(reason) => write!(f, "EagerPromise(Rejected({:?}))", reason),
        }
    }
}
