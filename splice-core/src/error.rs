//! Errors carried by rejected tool outputs
//!
//! These never abort an evaluation. They travel through the cell graph
//! inside rejected [`EagerPromise`]s, like any other value.

use splice_promise::EagerPromise;
use splice_types::{ToolOutput, VarId};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Why a tool output was rejected
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("cyclic reference")]
    Cyclic,

    #[error("{label} is just a placeholder")]
    Placeholder { label: String },

    #[error("tool not found: {tool_name}")]
    NotFound { tool_name: String },

    #[error("no cells")]
    NoCells,

    #[error("no binding for variable {var}")]
    MissingBinding { var: VarId },

    #[error("program has no sub-program at {key:?}")]
    MissingProgram { key: String },

    #[error("{0}")]
    Failed(Rc<anyhow::Error>),
}

impl ToolError {
    /// Wrap an arbitrary failure from inside a tool
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        ToolError::Failed(Rc::new(err.into()))
    }

    /// Shorthand for a failure with just a message
    pub fn msg(message: impl fmt::Display) -> Self {
        ToolError::failed(anyhow::anyhow!("{}", message))
    }

    /// Whether this rejection comes from a reference cycle
    pub fn is_cyclic(&self) -> bool {
        matches!(self, ToolError::Cyclic)
    }
}

impl PartialEq for ToolError {
    fn eq(&self, other: &Self) -> bool {
        use ToolError::*;
        match (self, other) {
            (Cyclic, Cyclic) | (NoCells, NoCells) => true,
            (Placeholder { label: a }, Placeholder { label: b }) => a == b,
            (NotFound { tool_name: a }, NotFound { tool_name: b }) => a == b,
            (MissingBinding { var: a }, MissingBinding { var: b }) => a == b,
            (MissingProgram { key: a }, MissingProgram { key: b }) => a == b,
            (Failed(a), Failed(b)) => Rc::ptr_eq(a, b) || a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// The promise type every tool produces
pub type OutputPromise = EagerPromise<ToolOutput, ToolError>;

/// Result type for tool-side code before it is lifted into a promise
pub type Result<T> = std::result::Result<T, ToolError>;
