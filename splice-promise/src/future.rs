//! `Future` bridge for eager promises
//!
//! Lets async code `.await` an [`EagerPromise`]. Polling never drives any
//! work; it only reports settlement and registers the waker.

use crate::promise::{EagerPromise, State};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

impl<T: Clone + 'static, E: Clone + 'static> Future for EagerPromise<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.settled() {
            return Poll::Ready(result);
        }

        if let State::Pending { wakers, .. } = &mut *self.inner.borrow_mut() {
            if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                wakers.push(cx.waker().clone());
            }
        }
        Poll::Pending
    }
}
