//! Eager promises for splice
//!
//! Tool outputs are delivered as promises that settle at most once. Unlike
//! ordinary async values these never wait for a scheduler: a continuation
//! attached to an already-settled promise runs before the attaching call
//! returns. This keeps a full reactive pass synchronous whenever every
//! input is already known.
//!
//! ```
//! use splice_promise::{EagerPromise, PromiseState};
//!
//! let doubled = EagerPromise::<i32, String>::resolve(21).map(|x| x * 2);
//! assert_eq!(doubled.state(), PromiseState::Fulfilled(42));
//! ```

#![warn(missing_docs)]

pub mod future;
pub mod promise;

pub use promise::{EagerPromise, PromiseState, Resolver};
