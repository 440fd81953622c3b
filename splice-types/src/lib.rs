//! Shared types for splice
//!
//! This crate provides the plain data shared across the splice engine:
//! variable identifiers, tool programs and tool outputs. Nothing here knows
//! about memory, promises or evaluation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a variable (a cell name, a loop item, the previous cell...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub String);

impl VarId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarId {
    fn from(id: &str) -> Self {
        VarId(id.to_string())
    }
}

impl From<String> for VarId {
    fn from(id: String) -> Self {
        VarId(id)
    }
}

/// A named variable: a stable id plus the label shown to people
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Var {
    pub id: VarId,
    pub label: String,
}

impl Var {
    pub fn new(id: impl Into<VarId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Create a variable with a freshly minted id
    pub fn fresh(label: impl Into<String>) -> Self {
        Self::new(new_id(), label)
    }
}

/// Mint a new variable id (`ID` followed by a random uuid)
pub fn new_id() -> VarId {
    VarId(format!("ID{}", uuid::Uuid::new_v4().simple()))
}

/// A serializable description of a computation
///
/// The only field the engine looks at is `toolName`, which picks the tool
/// implementation. Everything else belongs to the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub tool_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_id: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Program {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            debug_id: None,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder-style setter for a nested program
    pub fn with_program(self, key: impl Into<String>, program: &Program) -> Self {
        let value = serde_json::to_value(program).unwrap_or(Value::Null);
        self.with(key, value)
    }

    pub fn with_debug_id(mut self, debug_id: impl Into<String>) -> Self {
        self.debug_id = Some(debug_id.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Read a field holding a nested program
    pub fn sub_program(&self, key: &str) -> Option<Program> {
        self.fields
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Canonical byte encoding (fields are kept in sorted order)
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Short human-readable description, e.g. `notebook#main`
    pub fn summary(&self) -> String {
        match &self.debug_id {
            Some(debug_id) => format!("{}#{}", self.tool_name, debug_id),
            None => self.tool_name.clone(),
        }
    }
}

/// The value a tool produces
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: Value,
}

impl ToolOutput {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}
