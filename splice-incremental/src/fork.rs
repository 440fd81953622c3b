//! Keyed sub-trails for variable-length collections
//!
//! A fork maps application-chosen keys to trails. Each pass declares the
//! keys it uses; keys left untouched when the pass finishes are pruned,
//! taking their memoized state with them.

use crate::memory::{Slot, SlotKind, Trail};
use crate::run::{run_trail, Run};
use hashbrown::{HashMap, HashSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Shared storage behind a fork slot
pub type Branches = Rc<RefCell<HashMap<String, Trail>>>;

/// One pass over a fork
///
/// Obtained from [`Run::fork`]. Finishing the pass with [`ForkAccess::done`]
/// (or dropping the access) prunes every key that was not branched on.
pub struct ForkAccess {
    branches: Branches,
    used: HashSet<String>,
    finished: bool,
}

impl ForkAccess {
    /// Run `f` on the trail for `key`, creating it on first use
    ///
    /// # Panics
    ///
    /// Panics if `key` was already used in this pass.
    pub fn branch<R>(&mut self, key: impl AsRef<str>, f: impl FnOnce(&mut Run<'_>) -> R) -> R {
        let key = key.as_ref();
        if !self.used.insert(key.to_string()) {
            panic!("fork key used twice in one pass: {:?}", key);
        }

        let mut trail = self.branches.borrow_mut().remove(key).unwrap_or_default();
        let result = run_trail(&mut trail, f);
        self.branches.borrow_mut().insert(key.to_string(), trail);
        result
    }

    /// Keys branched on so far in this pass
    pub fn used_keys(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }

    /// Finish the pass, pruning untouched keys
    pub fn done(mut self) {
        self.prune();
    }

    fn prune(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let used = &self.used;
        self.branches.borrow_mut().retain(|key, _| {
            let keep = used.contains(key);
            if !keep {
                trace!(key = %key, "pruning fork branch");
            }
            keep
        });
    }
}

impl Drop for ForkAccess {
    fn drop(&mut self) {
        self.prune();
    }
}

impl fmt::Debug for ForkAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkAccess")
            .field("used", &self.used)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<'t> Run<'t> {
    /// Claim a fork slot and start a pass over it
    pub fn fork(&mut self) -> ForkAccess {
        let position = self.position();
        let branches = match self.claim(SlotKind::Fork, || Slot::Fork(Branches::default())) {
            Slot::Fork(branches) => branches,
            other => panic!("slot {} is a {} slot, not a fork", position, other.kind()),
        };
        ForkAccess {
            branches,
            used: HashSet::new(),
            finished: false,
        }
    }

    /// Scoped form of [`Run::fork`]: the pass finishes when `f` returns
    pub fn fork_each<R>(&mut self, f: impl FnOnce(&mut ForkAccess) -> R) -> R {
        let mut fork = self.fork();
        let result = f(&mut fork);
        fork.done();
        result
    }
}
