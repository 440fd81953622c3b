//! # splice-core
//!
//! Tool dispatch, reference resolution and cell-network evaluation for
//! splice.
//!
//! Tools are registered in a [`ToolRegistry`] and run through
//! [`run_tool`], which gives each tool private memory that survives across
//! evaluations. A [`CellNetwork`] wires a set of inter-referencing cells
//! together: [`run_cells`] resolves their references, sorts them, contains
//! cycles and re-runs only what changed.

pub mod cells;
pub mod config;
pub mod error;
pub mod hooks;
pub mod references;
pub mod registry;
pub mod tool;
pub mod toposort;

pub use cells::{network_references, run_cells, Cell, CellNetwork, CellNetworkResult, CellResult};
pub use config::{ConfigError, EngineConfig};
pub use error::{OutputPromise, ToolError};
pub use hooks::{relevant_var_bindings, run_program, run_sub_tool, run_tool};
pub use references::{resolve_references, ReferenceCollection, ReferenceEntry};
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Tool, ToolProps, ToolResult, ToolView, VarBinding, VarBindings};
pub use toposort::{toposort, toposort_from_edges, Toposort, ToposortError};

pub use splice_incremental::{Memory, Run};
pub use splice_promise::{EagerPromise, PromiseState};
pub use splice_types::{new_id, Program, ToolOutput, Var, VarId};
