//! Running incremental functions
//!
//! A [`Run`] is the cursor over a trail during one execution. It is passed
//! explicitly to the function body, which claims slots through it in a
//! fixed order. The shape of that order is checked on every claim and again
//! when the run ends.

use crate::memory::{Memory, Ref, Slot, SlotKind, Trail};
use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Cursor over a trail for the duration of one run
pub struct Run<'t> {
    trail: &'t mut Trail,
    position: usize,
}

/// Run `f` against `memory`, replaying its trail if one was recorded
///
/// # Panics
///
/// Panics if `memory` is already running, or if `f` claims a different
/// number or kind of slots than it did on the recorded run.
pub fn run_incremental<R>(memory: &Memory, f: impl FnOnce(&mut Run<'_>) -> R) -> R {
    let mut trail = memory.enter();
    run_trail(&mut trail, f)
}

/// Turn a function body into an incremental function over a [`Memory`]
pub fn hooks<A, R, F>(f: F) -> impl Fn(&Memory, A) -> R
where
    F: Fn(&mut Run<'_>, A) -> R,
{
    move |memory: &Memory, args: A| run_incremental(memory, |run| f(run, args))
}

pub(crate) fn run_trail<R>(trail: &mut Trail, f: impl FnOnce(&mut Run<'_>) -> R) -> R {
    if !trail.recorded {
        // a first run that panicked part-way leaves a partial trail behind
        trail.slots.clear();
    }
    let mut run = Run { trail, position: 0 };
    let result = f(&mut run);
    run.finish();
    result
}

impl<'t> Run<'t> {
    /// Number of slots claimed so far in this run
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether this run is recording a trail for the first time
    pub fn is_first_run(&self) -> bool {
        !self.trail.recorded
    }

    pub(crate) fn claim(&mut self, kind: SlotKind, create: impl FnOnce() -> Slot) -> Slot {
        let position = self.position;
        self.position += 1;

        if !self.trail.recorded {
            let slot = create();
            self.trail.slots.push(slot.clone());
            return slot;
        }

        let recorded = self.trail.slots.len();
        match self.trail.slots.get(position) {
            Some(slot) if slot.kind() == kind => slot.clone(),
            Some(slot) => panic!(
                "slot {} changed kind between runs: {} => {}",
                position,
                slot.kind(),
                kind
            ),
            None => panic!(
                "changed number of slots between runs: {} => {}",
                recorded,
                position + 1
            ),
        }
    }

    /// Claim a value slot, initialised with `init` on the first run
    ///
    /// Returns the same [`Ref`] on every run.
    pub fn slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Ref<T> {
        let position = self.position;
        let slot = self.claim(SlotKind::Value, || {
            Slot::Value(Rc::new(RefCell::new(init())))
        });
        match slot {
            Slot::Value(any) => match any.downcast::<RefCell<T>>() {
                Ok(cell) => Ref(cell),
                Err(_) => panic!(
                    "slot {} changed type between runs: expected {}",
                    position,
                    type_name::<T>()
                ),
            },
            other => panic!("slot {} is a {} slot, not a value", position, other.kind()),
        }
    }

    /// Claim a slot holding a child memory, created on the first run
    pub fn memory_slot(&mut self) -> Memory {
        let position = self.position;
        match self.claim(SlotKind::Memory, || Slot::Memory(Memory::new())) {
            Slot::Memory(memory) => memory,
            other => panic!("slot {} is a {} slot, not a memory", position, other.kind()),
        }
    }

    /// Call an incremental function against a private child memory
    pub fn incr<A, R>(&mut self, f: impl Fn(&Memory, A) -> R, args: A) -> R {
        let memory = self.memory_slot();
        f(&memory, args)
    }

    /// Bind an incremental function to a private child memory, so several
    /// calls in this run (or after it) share memoized sub-results
    pub fn shared_incr<F>(&mut self, f: F) -> Shared<F> {
        Shared {
            memory: self.memory_slot(),
            f,
        }
    }

    /// Reserve a sub-trail that may be run later, possibly after this run
    /// has returned
    pub fn later(&mut self) -> Later {
        Later {
            memory: self.memory_slot(),
        }
    }

    fn finish(self) {
        if self.trail.recorded {
            let recorded = self.trail.slots.len();
            if self.position != recorded {
                panic!(
                    "changed number of slots between runs: {} => {}",
                    recorded, self.position
                );
            }
        } else {
            self.trail.recorded = true;
        }
    }
}

impl fmt::Debug for Run<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("position", &self.position)
            .field("recorded", &self.trail.recorded)
            .field("slots", &self.trail.slots.len())
            .finish()
    }
}

/// An incremental function bound to a persistent child memory
#[derive(Clone)]
pub struct Shared<F> {
    memory: Memory,
    f: F,
}

impl<F> Shared<F> {
    /// Invoke the bound function
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(&Memory, A) -> R,
    {
        (self.f)(&self.memory, args)
    }

    /// The memory the function runs against
    pub fn memory(&self) -> &Memory {
        &self.memory
    }
}

impl<F> fmt::Debug for Shared<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared").field("memory", &self.memory).finish()
    }
}

/// A deferred sub-computation with a stable place in its parent's trail
///
/// Useful when the work can only happen once some gate passes, for example
/// inside a promise continuation.
#[derive(Debug, Clone)]
pub struct Later {
    memory: Memory,
}

impl Later {
    /// Run `f` on the reserved sub-trail
    pub fn run<R>(&self, f: impl FnOnce(&mut Run<'_>) -> R) -> R {
        run_incremental(&self.memory, f)
    }
}
