//! Tool registry and reference resolution
//!
//! The registry maps tool names to implementations. Unknown names fall
//! back to a built-in tool that rejects with [`ToolError::NotFound`], so
//! evaluation never stops at an unregistered program.

use crate::config::EngineConfig;
use crate::error::ToolError;
use crate::references::{resolve_references, ReferenceCollection};
use crate::tool::{Tool, ToolProps, ToolResult};
use lru::LruCache;
use splice_incremental::Memory;
use splice_types::{Program, VarId};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool produced a program with an empty tool name")]
    EmptyToolName,
}

/// Registry of tools, indexed by the tool name their programs carry
pub struct ToolRegistry {
    tools: HashMap<String, Rc<dyn Tool>>,
    not_found: Rc<dyn Tool>,
    config: EngineConfig,
    reference_cache: RefCell<LruCache<blake3::Hash, Rc<BTreeSet<VarId>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.reference_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            tools: HashMap::new(),
            not_found: Rc::new(NotFoundTool {
                tool_name: config.not_found_tool.clone(),
            }),
            config,
            reference_cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a tool under the name its fresh programs carry
    ///
    /// Replaces any tool already registered under that name.
    pub fn register(&mut self, tool: Rc<dyn Tool>) -> Result<(), RegistryError> {
        let tool_name = tool.make_program(None).tool_name;
        if tool_name.is_empty() {
            return Err(RegistryError::EmptyToolName);
        }
        if self.tools.insert(tool_name.clone(), tool).is_some() {
            warn!(tool = %tool_name, "replaced an already registered tool");
        }
        // cached reference sets may have come from the replaced tool
        self.reference_cache.borrow_mut().clear();
        Ok(())
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    /// Names of all registered tools, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a tool, falling back to the not-found tool
    pub fn lookup(&self, tool_name: &str) -> Rc<dyn Tool> {
        match self.tools.get(tool_name) {
            Some(tool) => tool.clone(),
            None => {
                if tool_name != self.config.not_found_tool {
                    warn!(tool = %tool_name, "tool not found, using fallback");
                }
                self.not_found.clone()
            }
        }
    }

    /// The ids `program` references, resolved through its tool
    ///
    /// Cached per distinct program value.
    pub fn references(&self, program: &Program) -> Rc<BTreeSet<VarId>> {
        let key = blake3::hash(&program.canonical_bytes());
        if let Some(cached) = self.reference_cache.borrow_mut().get(&key) {
            return cached.clone();
        }

        debug!(program = %program.summary(), "reference cache miss");
        let collection = self.lookup(&program.tool_name).references(program);
        let resolved = Rc::new(self.resolve(&collection));
        self.reference_cache.borrow_mut().put(key, resolved.clone());
        resolved
    }

    /// Resolve a collection, dispatching nested programs to their tools
    pub fn resolve(&self, collection: &ReferenceCollection) -> BTreeSet<VarId> {
        resolve_references(collection, &mut |program| self.references(program))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .field("config", &self.config)
            .finish()
    }
}

/// Stand-in for programs whose tool is not registered
struct NotFoundTool {
    tool_name: String,
}

impl Tool for NotFoundTool {
    fn make_program(&self, _default_input: Option<&str>) -> Program {
        Program::new(self.tool_name.clone())
    }

    fn references(&self, _program: &Program) -> ReferenceCollection {
        ReferenceCollection::none()
    }

    fn run(&self, _memory: &Memory, props: &ToolProps) -> ToolResult {
        ToolResult::rejected(ToolError::NotFound {
            tool_name: props.program.tool_name.clone(),
        })
    }
}
