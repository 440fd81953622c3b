//! Persistent memory handles and their trails
//!
//! A [`Memory`] owns one [`Trail`]: the ordered list of [`Slot`]s an
//! incremental function claimed the first time it ran against that memory.
//! Later runs replay the same trail, so the n-th slot claimed in any run is
//! the same object as the n-th slot claimed in the first.

use crate::fork::Branches;
use std::any::Any;
use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Handle to the memoized state of one long-lived computation instance
///
/// Created by the caller and passed into the same incremental function on
/// every invocation. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct Memory(pub(crate) Rc<RefCell<Trail>>);

impl Memory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both handles refer to the same memory
    pub fn ptr_eq(&self, other: &Memory) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of slots recorded so far (zero before the first run)
    pub fn slot_count(&self) -> usize {
        self.0.try_borrow().map(|trail| trail.len()).unwrap_or(0)
    }

    /// Whether a complete run has been recorded
    pub fn is_recorded(&self) -> bool {
        self.0.try_borrow().map(|trail| trail.recorded).unwrap_or(false)
    }

    pub(crate) fn enter(&self) -> RefMut<'_, Trail> {
        match self.0.try_borrow_mut() {
            Ok(trail) => trail,
            Err(_) => panic!(
                "memory is already running: an incremental function must not re-enter its own memory"
            ),
        }
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(trail) => f
                .debug_struct("Memory")
                .field("slots", &trail.len())
                .field("recorded", &trail.recorded)
                .finish(),
            Err(_) => f.write_str("Memory(<running>)"),
        }
    }
}

/// The ordered slots recorded by one incremental function body
#[derive(Default)]
pub struct Trail {
    pub(crate) slots: Vec<Slot>,
    pub(crate) recorded: bool,
}

impl Trail {
    /// Number of recorded slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots are recorded
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Kinds of the recorded slots, in order
    pub fn kinds(&self) -> Vec<SlotKind> {
        self.slots.iter().map(Slot::kind).collect()
    }
}

impl fmt::Debug for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trail")
            .field("slots", &self.kinds())
            .field("recorded", &self.recorded)
            .finish()
    }
}

/// One positionally addressed persistent cell
#[derive(Clone)]
pub enum Slot {
    /// A raw value, created once and mutated in place
    Value(Rc<dyn Any>),
    /// A child memory
    Memory(Memory),
    /// Keyed sub-trails
    Fork(Branches),
}

/// The kind of a [`Slot`], checked on every replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// See [`Slot::Value`]
    Value,
    /// See [`Slot::Memory`]
    Memory,
    /// See [`Slot::Fork`]
    Fork,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::Value => "value",
            SlotKind::Memory => "memory",
            SlotKind::Fork => "fork",
        })
    }
}

impl Slot {
    /// The kind of this slot
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::Value(_) => SlotKind::Value,
            Slot::Memory(_) => SlotKind::Memory,
            Slot::Fork(_) => SlotKind::Fork,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot::{}", self.kind())
    }
}

/// Handle to the payload of a value slot
///
/// The substrate never overwrites the payload; the function body decides
/// when to change it.
pub struct Ref<T>(pub(crate) Rc<RefCell<T>>);

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Ref(self.0.clone())
    }
}

impl<T> Ref<T> {
    /// Immutably borrow the payload
    pub fn borrow(&self) -> CellRef<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the payload
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Overwrite the payload
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Overwrite the payload, returning the old one
    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// Whether both handles point at the same slot payload
    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Ref<T> {
    /// Clone the payload out
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Ref").field(&*value).finish(),
            Err(_) => f.write_str("Ref(<borrowed>)"),
        }
    }
}
