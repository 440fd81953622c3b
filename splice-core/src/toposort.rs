//! Topological sorting with cycle containment
//!
//! An edge `x -> y` means "x depends on y". The result lists every node
//! that is not in (or downstream of) a cycle in `sorted`, dependencies
//! first; the rest end up in `cyclic`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToposortError {
    #[error("Unknown node in edges: {0}")]
    UnknownNode(String),
}

/// Result of [`toposort`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toposort<S: Ord> {
    /// Acyclic nodes, each after everything it depends on
    pub sorted: Vec<S>,
    /// Nodes in a cycle or depending on one
    pub cyclic: BTreeSet<S>,
}

/// Sort `nodes` given each node's outgoing edges
///
/// Nodes without an entry in `outgoing` have no dependencies. Fails if an
/// edge mentions a node missing from `nodes`.
pub fn toposort<S>(
    nodes: &[S],
    outgoing: &BTreeMap<S, BTreeSet<S>>,
) -> Result<Toposort<S>, ToposortError>
where
    S: Ord + Clone + Debug,
{
    let known: BTreeSet<&S> = nodes.iter().collect();
    for (node, targets) in outgoing {
        if let Some(unknown) = std::iter::once(node)
            .chain(targets.iter())
            .find(|n| !known.contains(n))
        {
            return Err(ToposortError::UnknownNode(format!("{:?}", unknown)));
        }
    }

    let mut visitor = Visitor {
        outgoing,
        visited: BTreeSet::new(),
        path: BTreeSet::new(),
        sorted: Vec::new(),
        cyclic: BTreeSet::new(),
    };
    for node in nodes {
        visitor.visit(node);
    }

    Ok(Toposort {
        sorted: visitor.sorted,
        cyclic: visitor.cyclic,
    })
}

/// [`toposort`] over an edge list
pub fn toposort_from_edges<S>(nodes: &[S], edges: &[(S, S)]) -> Result<Toposort<S>, ToposortError>
where
    S: Ord + Clone + Debug,
{
    let mut outgoing: BTreeMap<S, BTreeSet<S>> = BTreeMap::new();
    for (from, to) in edges {
        outgoing.entry(from.clone()).or_default().insert(to.clone());
    }
    toposort(nodes, &outgoing)
}

struct Visitor<'a, S: Ord> {
    outgoing: &'a BTreeMap<S, BTreeSet<S>>,
    visited: BTreeSet<S>,
    path: BTreeSet<S>,
    sorted: Vec<S>,
    cyclic: BTreeSet<S>,
}

impl<S: Ord + Clone> Visitor<'_, S> {
    /// Returns whether `node` is in or downstream of a cycle
    fn visit(&mut self, node: &S) -> bool {
        if self.path.contains(node) {
            return true;
        }
        if !self.visited.insert(node.clone()) {
            return self.cyclic.contains(node);
        }

        let outgoing = self.outgoing;
        let mut in_cycle = false;
        if let Some(targets) = outgoing.get(node).filter(|t| !t.is_empty()) {
            self.path.insert(node.clone());
            for target in targets {
                if self.visit(target) {
                    in_cycle = true;
                }
            }
            self.path.remove(node);
        }

        if in_cycle {
            self.cyclic.insert(node.clone());
        } else {
            self.sorted.push(node.clone());
        }
        in_cycle
    }
}
