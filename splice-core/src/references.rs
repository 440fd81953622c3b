//! Reference collections and their resolution
//!
//! A tool describes what its program depends on as a [`ReferenceCollection`]:
//! plain variable ids, nested programs (resolved by their own tool), and
//! lists that may subtract a sub-collection from what has been gathered so
//! far.
//!
//! Exclusion only affects ids gathered *before* it in the same list:
//! `[A, -[A]]` resolves to `{}` while `[-[A], A]` resolves to `{A}`.

use splice_types::{Program, Var, VarId};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Structural description of the variables a program depends on
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceCollection {
    /// A single variable
    Var(VarId),
    /// Whatever a nested program references, resolved by its tool
    Program(Program),
    /// Entries applied left to right
    List(Vec<ReferenceEntry>),
}

/// One entry of a [`ReferenceCollection::List`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceEntry {
    /// Add to what has been gathered so far
    Include(ReferenceCollection),
    /// Remove from what has been gathered so far
    Exclude(ReferenceCollection),
}

impl ReferenceCollection {
    /// The empty collection
    pub fn none() -> Self {
        ReferenceCollection::List(Vec::new())
    }

    /// One variable
    pub fn var(id: impl Into<VarId>) -> Self {
        ReferenceCollection::Var(id.into())
    }

    /// A nested program
    pub fn program(program: Program) -> Self {
        ReferenceCollection::Program(program)
    }

    /// A list of entries, including exclusions
    pub fn list(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        ReferenceCollection::List(entries.into_iter().collect())
    }

    /// Union of several collections
    pub fn all(collections: impl IntoIterator<Item = ReferenceCollection>) -> Self {
        Self::list(collections.into_iter().map(ReferenceEntry::Include))
    }

    /// Union of several variables
    pub fn vars<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VarId>,
    {
        Self::all(ids.into_iter().map(Self::var))
    }

    /// Union of several nested programs
    pub fn programs<'a>(programs: impl IntoIterator<Item = &'a Program>) -> Self {
        Self::all(programs.into_iter().cloned().map(Self::program))
    }
}

impl ReferenceEntry {
    /// See [`ReferenceEntry::Include`]
    pub fn include(collection: ReferenceCollection) -> Self {
        ReferenceEntry::Include(collection)
    }

    /// See [`ReferenceEntry::Exclude`]
    pub fn exclude(collection: ReferenceCollection) -> Self {
        ReferenceEntry::Exclude(collection)
    }
}

impl From<VarId> for ReferenceCollection {
    fn from(id: VarId) -> Self {
        ReferenceCollection::Var(id)
    }
}

impl From<&Var> for ReferenceCollection {
    fn from(var: &Var) -> Self {
        ReferenceCollection::Var(var.id.clone())
    }
}

impl From<Program> for ReferenceCollection {
    fn from(program: Program) -> Self {
        ReferenceCollection::Program(program)
    }
}

impl From<Vec<ReferenceEntry>> for ReferenceCollection {
    fn from(entries: Vec<ReferenceEntry>) -> Self {
        ReferenceCollection::List(entries)
    }
}

/// Resolve `collection` to a set of ids
///
/// Nested programs are handed to `resolve_program`, which is expected to
/// dispatch to the program's tool (and may cache).
pub fn resolve_references(
    collection: &ReferenceCollection,
    resolve_program: &mut dyn FnMut(&Program) -> Rc<BTreeSet<VarId>>,
) -> BTreeSet<VarId> {
    match collection {
        ReferenceCollection::Var(id) => BTreeSet::from([id.clone()]),
        ReferenceCollection::Program(program) => (*resolve_program(program)).clone(),
        ReferenceCollection::List(entries) => {
            let mut gathered = BTreeSet::new();
            for entry in entries {
                match entry {
                    ReferenceEntry::Include(inner) => {
                        gathered.extend(resolve_references(inner, resolve_program));
                    }
                    ReferenceEntry::Exclude(inner) => {
                        let removed = resolve_references(inner, resolve_program);
                        gathered.retain(|id| !removed.contains(id));
                    }
                }
            }
            gathered
        }
    }
}
