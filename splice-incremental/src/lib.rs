//! Splice incremental computation substrate
//!
//! This crate provides position-keyed persistent state for incremental
//! functions. An incremental function receives a [`Memory`] on every
//! invocation and claims slots from it, in order, through a [`Run`] cursor.
//! Because slots are identified by their position, the function body must
//! claim the same slots in the same order on every run; this is checked.
//!
//! # Architecture
//!
//! - **Slots** ([`Run::slot`]) hold raw values that survive across runs.
//! - **Child memories** ([`Run::incr`], [`Run::shared_incr`], [`Run::later`])
//!   give a callee its own private, persistent trail.
//! - **Forks** ([`Run::fork`]) key sub-trails by stable ids instead of
//!   position, and prune the ids a pass did not use.
//! - **Combinators** ([`Run::memo`], [`Run::dedupe`], [`memoize`],
//!   [`memoize_forever`]) decide when to recompute.
//!
//! # Example
//!
//! ```rust
//! use splice_incremental::{hooks, Memory};
//!
//! let double = hooks(|run, x: i32| run.memo(x, |_| x * 2));
//! let memory = Memory::new();
//! assert_eq!(double(&memory, 21), 42);
//! assert_eq!(double(&memory, 21), 42); // served from the memo slot
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Core modules
pub mod memory;
pub mod run;
pub mod fork;
pub mod memo;
pub mod eq;

// Re-export main types
pub use fork::{Branches, ForkAccess};
pub use memo::{memoize, memoize_by, memoize_forever};
pub use memory::{Memory, Ref, Slot, SlotKind, Trail};
pub use run::{hooks, run_incremental, Later, Run, Shared};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{hooks, memoize, memoize_by, memoize_forever, run_incremental};
    pub use crate::{ForkAccess, Later, Memory, Ref, Run, Shared};
}
