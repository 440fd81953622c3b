//! The tool interface and the values that flow between tools

use crate::error::{OutputPromise, ToolError};
use crate::references::ReferenceCollection;
use crate::registry::ToolRegistry;
use splice_incremental::eq::map_eq_by_ref;
use splice_incremental::Memory;
use splice_promise::EagerPromise;
use splice_types::{Program, ToolOutput, Var, VarId};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A unit type: creates, analyses and runs programs naming it
pub trait Tool {
    /// A fresh program for this tool, optionally seeded with input text
    fn make_program(&self, default_input: Option<&str>) -> Program;

    /// The variables `program` depends on
    fn references(&self, program: &Program) -> ReferenceCollection;

    /// Run `program` against the caller-owned `memory`
    fn run(&self, memory: &Memory, props: &ToolProps) -> ToolResult;
}

/// Everything a tool receives when it runs
#[derive(Clone)]
pub struct ToolProps {
    pub program: Program,
    pub var_bindings: VarBindings,
    pub registry: Rc<ToolRegistry>,
}

impl ToolProps {
    pub fn new(program: Program, var_bindings: VarBindings, registry: Rc<ToolRegistry>) -> Self {
        Self {
            program,
            var_bindings,
            registry,
        }
    }

    /// Same props, different program (used for sub-tools)
    pub fn with_program(&self, program: Program) -> Self {
        Self {
            program,
            var_bindings: self.var_bindings.clone(),
            registry: self.registry.clone(),
        }
    }

    /// Same props, different bindings
    pub fn with_var_bindings(&self, var_bindings: VarBindings) -> Self {
        Self {
            program: self.program.clone(),
            var_bindings,
            registry: self.registry.clone(),
        }
    }

    /// Props equality for tools that memoize on their props: programs by
    /// value, bindings by reference
    pub fn same_as(&self, other: &ToolProps) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
            && self.var_bindings.entries_eq(&other.var_bindings)
            && self.program == other.program
    }
}

impl fmt::Debug for ToolProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolProps")
            .field("program", &self.program.summary())
            .field("var_bindings", &self.var_bindings)
            .finish()
    }
}

/// What running a tool produces
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub output: OutputPromise,
    pub view: ToolView,
}

impl ToolResult {
    pub fn new(output: OutputPromise, view: ToolView) -> Self {
        Self { output, view }
    }

    /// A result with no view
    pub fn from_output(output: OutputPromise) -> Self {
        Self::new(output, ToolView::none())
    }

    /// A settled, successful result with no view
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::from_output(EagerPromise::resolve(ToolOutput::new(value)))
    }

    /// A rejected result with no view
    pub fn rejected(error: ToolError) -> Self {
        Self::from_output(EagerPromise::reject(error))
    }
}

/// Opaque handle for whatever a view layer wants to render
///
/// The engine never looks inside.
#[derive(Clone, Default)]
pub struct ToolView(Option<Rc<dyn Any>>);

impl ToolView {
    pub fn new<T: 'static>(view: T) -> Self {
        ToolView(Some(Rc::new(view)))
    }

    pub fn none() -> Self {
        ToolView(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|view| view.downcast_ref::<T>())
    }
}

impl fmt::Debug for ToolView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("ToolView(..)"),
            None => f.write_str("ToolView(None)"),
        }
    }
}

/// A variable together with the promise of its value
#[derive(Debug, Clone)]
pub struct VarBinding {
    pub var: Var,
    pub output: OutputPromise,
}

impl VarBinding {
    pub fn new(var: Var, output: OutputPromise) -> Self {
        Self { var, output }
    }
}

/// The variables in scope for a tool, keyed by id
///
/// Shared: clones are cheap and compare equal under [`VarBindings::ptr_eq`].
#[derive(Clone, Default)]
pub struct VarBindings(Rc<BTreeMap<VarId, Rc<VarBinding>>>);

impl VarBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<VarId, Rc<VarBinding>>) -> Self {
        VarBindings(Rc::new(map))
    }

    pub fn get(&self, id: &VarId) -> Option<&Rc<VarBinding>> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &VarId) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &Rc<VarBinding>)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &VarId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of the underlying map, for building a derived scope
    pub fn to_map(&self) -> BTreeMap<VarId, Rc<VarBinding>> {
        (*self.0).clone()
    }

    /// These bindings overlaid with `extra` (entries in `extra` win)
    pub fn merged(&self, extra: impl IntoIterator<Item = Rc<VarBinding>>) -> Self {
        let mut map = self.to_map();
        for binding in extra {
            map.insert(binding.var.id.clone(), binding);
        }
        Self::from_map(map)
    }

    pub fn ptr_eq(&self, other: &VarBindings) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Same ids, each bound to the identical binding object
    pub fn entries_eq(&self, other: &VarBindings) -> bool {
        self.ptr_eq(other) || map_eq_by_ref(&self.0, &other.0)
    }
}

impl FromIterator<Rc<VarBinding>> for VarBindings {
    fn from_iter<I: IntoIterator<Item = Rc<VarBinding>>>(iter: I) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|binding| (binding.var.id.clone(), binding))
                .collect(),
        )
    }
}

impl fmt::Debug for VarBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}
