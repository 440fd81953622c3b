//! Cell networks
//!
//! A cell network is a set of named cells whose programs may reference one
//! another (and, for chained networks, the cell just above them). Each
//! evaluation sorts the cells by their references, runs them in order, and
//! wires every cell's inputs from its siblings' latest outputs.
//!
//! Bindings handed to a cell are cached per sibling, so an unrelated
//! sibling changing does not disturb the identity of the bindings a cell
//! sees. [`run_tool`] narrows those to the ones the program references,
//! so a tool memoizing on its props skips unchanged work.
//!
//! Cells caught in a reference cycle never abort the evaluation: they are
//! reported in [`CellNetworkResult::cyclic`] and their outputs reject with
//! [`ToolError::Cyclic`].

use crate::config::EngineConfig;
use crate::error::{OutputPromise, ToolError};
use crate::hooks::run_tool;
use crate::references::{ReferenceCollection, ReferenceEntry};
use crate::registry::ToolRegistry;
use crate::tool::{ToolProps, ToolView, VarBinding, VarBindings};
use crate::toposort::{toposort, Toposort};
use serde::{Deserialize, Serialize};
use splice_incremental::eq::ref_eq;
use splice_incremental::{memoize_forever, ForkAccess, Run};
use splice_promise::EagerPromise;
use splice_types::{Program, Var, VarId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use tracing::debug;

/// One named entry of a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub var: Var,
    pub program: Program,
}

impl Cell {
    pub fn new(var: Var, program: Program) -> Self {
        Self { var, program }
    }
}

/// An ordered list of cells plus, for chained networks, the variable that
/// stands for "the previous cell"
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellNetwork {
    pub cells: Vec<Cell>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_var: Option<Var>,
}

impl CellNetwork {
    /// A network without previous-cell linkage
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            prev_var: None,
        }
    }

    /// A chained network with a freshly minted previous-cell variable
    pub fn new_chain(cells: Vec<Cell>, config: &EngineConfig) -> Self {
        Self {
            cells,
            prev_var: Some(Var::fresh(config.prev_label.clone())),
        }
    }

    pub fn with_prev_var(mut self, prev_var: Var) -> Self {
        self.prev_var = Some(prev_var);
        self
    }

    pub fn cell(&self, id: &VarId) -> Option<&Cell> {
        self.cells.iter().find(|cell| &cell.var.id == id)
    }

    /// Each cell's predecessor, for chained networks
    fn predecessors(&self) -> HashMap<VarId, &Cell> {
        if self.prev_var.is_none() {
            return HashMap::new();
        }
        self.cells
            .windows(2)
            .map(|pair| (pair[1].var.id.clone(), &pair[0]))
            .collect()
    }
}

/// What one cell produced
#[derive(Debug, Clone)]
pub struct CellResult {
    pub output: OutputPromise,
    pub view: ToolView,
    /// The scope the cell was evaluated in (its tool only sees the
    /// referenced part)
    pub bindings: VarBindings,
    /// Sibling outputs (and the previous cell) as seen from inside the cell
    pub visible_bindings: VarBindings,
}

/// What a network evaluation produced
#[derive(Debug, Clone)]
pub struct CellNetworkResult {
    pub results: BTreeMap<VarId, CellResult>,
    pub sorted: Vec<VarId>,
    pub cyclic: BTreeSet<VarId>,
    last_cell: Option<VarId>,
}

impl CellNetworkResult {
    pub fn get(&self, id: &VarId) -> Option<&CellResult> {
        self.results.get(id)
    }

    /// The last cell's output, or a [`ToolError::NoCells`] rejection
    pub fn output(&self) -> OutputPromise {
        self.last_cell
            .as_ref()
            .and_then(|id| self.results.get(id))
            .map(|result| result.output.clone())
            .unwrap_or_else(|| EagerPromise::reject(ToolError::NoCells))
    }
}

/// The references a tool embedding `network` reports: whatever its cells
/// reference, minus the cells themselves and the previous-cell variable
pub fn network_references(network: &CellNetwork) -> ReferenceCollection {
    ReferenceCollection::list([
        ReferenceEntry::include(ReferenceCollection::programs(
            network.cells.iter().map(|cell| &cell.program),
        )),
        ReferenceEntry::exclude(ReferenceCollection::vars(
            network.cells.iter().map(|cell| cell.var.id.clone()),
        )),
        ReferenceEntry::exclude(ReferenceCollection::vars(
            network.prev_var.iter().map(|var| var.id.clone()),
        )),
    ])
}

/// Evaluate `network` with `var_bindings` as the enclosing scope
///
/// Claims a fixed number of slots from `run`, so it may be called from any
/// incremental function.
///
/// # Panics
///
/// Panics if two cells share an id.
pub fn run_cells(
    run: &mut Run<'_>,
    registry: &Rc<ToolRegistry>,
    network: &CellNetwork,
    var_bindings: &VarBindings,
) -> CellNetworkResult {
    let mut cell_ids = BTreeSet::new();
    for cell in &network.cells {
        if !cell_ids.insert(cell.var.id.clone()) {
            panic!("cell id used twice in one network: {}", cell.var.id);
        }
    }
    let prev_id = network.prev_var.as_ref().map(|var| &var.id);
    let predecessors = network.predecessors();

    let references: HashMap<&VarId, Rc<BTreeSet<VarId>>> = network
        .cells
        .iter()
        .map(|cell| (&cell.var.id, registry.references(&cell.program)))
        .collect();

    // dependencies between cells, in cell order
    let edges: Vec<(VarId, BTreeSet<VarId>)> = network
        .cells
        .iter()
        .map(|cell| {
            let refs = &references[&cell.var.id];
            let mut deps: BTreeSet<VarId> = refs.intersection(&cell_ids).cloned().collect();
            if let (Some(prev_id), Some(before)) = (prev_id, predecessors.get(&cell.var.id)) {
                if refs.contains(prev_id) {
                    deps.insert(before.var.id.clone());
                }
            }
            (cell.var.id.clone(), deps)
        })
        .collect();
    let edges = run.dedupe(Rc::new(edges), |a, b| a == b);
    let order = run.memo_by(edges.clone(), ref_eq, |_| Rc::new(sort_cells(&edges)));

    let placeholder = run.shared_incr(memoize_forever(|var: Var| {
        let label = var.label.clone();
        Rc::new(VarBinding::new(
            var,
            EagerPromise::reject(ToolError::Placeholder { label }),
        ))
    }));
    let mut sibling_bindings = BindingCache::new(run.fork());
    let mut prev_bindings = BindingCache::new(run.fork());
    let mut cell_runs = run.fork();
    // wrappers around final outputs, for what nested code sees
    let mut visible_siblings = BindingCache::new(run.fork());
    let mut visible_prev = BindingCache::new(run.fork());
    let mut scopes = run.fork();

    let cells_by_id: HashMap<&VarId, &Cell> =
        network.cells.iter().map(|cell| (&cell.var.id, cell)).collect();
    let mut ran: HashMap<VarId, (OutputPromise, ToolView, VarBindings)> = HashMap::new();
    for id in order.sorted.iter().chain(order.cyclic.iter()) {
        let Some(cell) = cells_by_id.get(id).copied() else {
            continue;
        };
        let is_cyclic = order.cyclic.contains(id);
        let refs = &references[id];
        let output_of = |source: &VarId| ran.get(source).map(|(output, _, _)| output.clone());

        let mut entries = var_bindings.to_map();
        for other in &network.cells {
            if &other.var.id != id && !refs.contains(&other.var.id) {
                entries.insert(other.var.id.clone(), placeholder.call(other.var.clone()));
            }
        }
        for ref_id in refs.iter() {
            if let Some(sibling) = cells_by_id.get(ref_id) {
                let binding = sibling_bindings.get(&sibling.var, output_of(ref_id));
                entries.insert(ref_id.clone(), binding);
            } else if Some(ref_id) == prev_id {
                if let (Some(prev_var), Some(before)) = (&network.prev_var, predecessors.get(id)) {
                    let var = prev_binding_var(prev_var, before);
                    let binding = prev_bindings.get_as(var, &before.var.id, output_of(&before.var.id));
                    entries.insert(ref_id.clone(), binding);
                }
            }
        }

        let (output, view, bindings) = cell_runs.branch(id.as_str(), |run| {
            let bindings = run.dedupe(VarBindings::from_map(entries), VarBindings::entries_eq);
            let cyclic_output = run.slot(|| EagerPromise::reject(ToolError::Cyclic));
            let props = ToolProps::new(cell.program.clone(), bindings.clone(), registry.clone());
            let result = run_tool(run, &props);
            let output = if is_cyclic { cyclic_output.get() } else { result.output };
            (output, result.view, bindings)
        });
        ran.insert(id.clone(), (output, view, bindings));
    }

    // every cell has run, so each binding can now wrap its final output
    let outputs: HashMap<VarId, OutputPromise> = ran
        .iter()
        .map(|(id, (output, _, _))| (id.clone(), output.clone()))
        .collect();
    let mut results = BTreeMap::new();
    for cell in &network.cells {
        let id = &cell.var.id;
        let Some((output, view, bindings)) = ran.remove(id) else {
            continue;
        };

        let mut visible = BTreeMap::new();
        for other in network.cells.iter().filter(|other| &other.var.id != id) {
            let binding = visible_siblings.get(&other.var, outputs.get(&other.var.id).cloned());
            visible.insert(other.var.id.clone(), binding);
        }
        if let (Some(prev_var), Some(before)) = (&network.prev_var, predecessors.get(id)) {
            let var = prev_binding_var(prev_var, before);
            let binding = visible_prev.get_as(var, &before.var.id, outputs.get(&before.var.id).cloned());
            visible.insert(prev_var.id.clone(), binding);
        }
        let visible_bindings = scopes.branch(id.as_str(), |run| {
            run.dedupe(VarBindings::from_map(visible), VarBindings::entries_eq)
        });

        results.insert(
            id.clone(),
            CellResult {
                output,
                view,
                bindings,
                visible_bindings,
            },
        );
    }

    sibling_bindings.done();
    prev_bindings.done();
    cell_runs.done();
    visible_siblings.done();
    visible_prev.done();
    scopes.done();

    CellNetworkResult {
        results,
        sorted: order.sorted.clone(),
        cyclic: order.cyclic.clone(),
        last_cell: network.cells.last().map(|cell| cell.var.id.clone()),
    }
}

fn sort_cells(edges: &[(VarId, BTreeSet<VarId>)]) -> Toposort<VarId> {
    let nodes: Vec<VarId> = edges.iter().map(|(id, _)| id.clone()).collect();
    let outgoing: BTreeMap<VarId, BTreeSet<VarId>> = edges.iter().cloned().collect();
    match toposort(&nodes, &outgoing) {
        Ok(order) => {
            debug!(
                cells = nodes.len(),
                sorted = ?order.sorted,
                cyclic = ?order.cyclic,
                "sorted cell network"
            );
            order
        }
        Err(err) => panic!("cell edges must only name cells of the network: {}", err),
    }
}

/// The variable a cell sees for "the previous cell"
fn prev_binding_var(prev_var: &Var, before: &Cell) -> Var {
    let label = if before.var.label.is_empty() {
        "[no label]"
    } else {
        before.var.label.as_str()
    };
    Var::new(prev_var.id.clone(), format!("↑ {}", label))
}

/// Per-pass cache of binding wrappers, one fork branch per source cell
///
/// A wrapper is rebuilt only when its variable or the wrapped output
/// changes.
struct BindingCache {
    fork: ForkAccess,
    made: HashMap<VarId, Rc<VarBinding>>,
}

impl BindingCache {
    fn new(fork: ForkAccess) -> Self {
        Self {
            fork,
            made: HashMap::new(),
        }
    }

    fn get(&mut self, var: &Var, output: Option<OutputPromise>) -> Rc<VarBinding> {
        self.get_as(var.clone(), &var.id, output)
    }

    /// Wrapper keyed by `source`, exposing `output` under `var`
    ///
    /// A missing output means the source has not run yet, which only
    /// happens inside a cycle. The first wrapper made for a source in a
    /// pass is reused for the rest of it.
    fn get_as(&mut self, var: Var, source: &VarId, output: Option<OutputPromise>) -> Rc<VarBinding> {
        if let Some(made) = self.made.get(source) {
            return made.clone();
        }
        let binding = self.fork.branch(source.as_str(), |run| {
            let cycle = run.slot(|| EagerPromise::reject(ToolError::Cyclic));
            let output = output.unwrap_or_else(|| cycle.get());
            let binding = Rc::new(VarBinding::new(var.clone(), output.clone()));
            run.memo_by((var, output), same_wrapped, move |_| binding)
        });
        self.made.insert(source.clone(), binding.clone());
        binding
    }

    fn done(self) {
        self.fork.done();
    }
}

fn same_wrapped(a: &(Var, OutputPromise), b: &(Var, OutputPromise)) -> bool {
    a.0 == b.0 && a.1.ptr_eq(&b.1)
}
