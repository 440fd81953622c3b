//! Running tools from inside incremental functions

use crate::error::ToolError;
use crate::tool::{ToolProps, ToolResult, VarBindings};
use splice_incremental::{run_incremental, ForkAccess, Memory, Run};
use tracing::trace;

/// Run the tool named by `props.program`
///
/// The run happens in a fork branch keyed by tool name, so switching a
/// program to a different tool starts that tool from fresh memory. The
/// tool runs on every call and sees only the bindings its program
/// references; skipping unchanged work is up to the tool's own memos.
pub fn run_tool(run: &mut Run<'_>, props: &ToolProps) -> ToolResult {
    let mut fork = run.fork();
    run_in_branch(&mut fork, props)
}

/// [`run_tool`] on a caller-owned memory
pub fn run_program(memory: &Memory, props: &ToolProps) -> ToolResult {
    run_incremental(memory, |run| run_tool(run, props))
}

/// Run the program stored at `key` in the parent's program, with the
/// parent's bindings
pub fn run_sub_tool(run: &mut Run<'_>, props: &ToolProps, key: &str) -> ToolResult {
    let mut fork = run.fork();
    match props.program.sub_program(key) {
        Some(program) => run_in_branch(&mut fork, &props.with_program(program)),
        None => ToolResult::rejected(ToolError::MissingProgram {
            key: key.to_string(),
        }),
    }
}

/// Only the bindings `props.program` actually references
///
/// Stays reference-identical across runs while those bindings do.
pub fn relevant_var_bindings(run: &mut Run<'_>, props: &ToolProps) -> VarBindings {
    let references = props.registry.references(&props.program);
    let relevant: VarBindings = references
        .iter()
        .filter_map(|id| props.var_bindings.get(id).cloned())
        .collect();
    run.dedupe(relevant, VarBindings::entries_eq)
}

fn run_in_branch(fork: &mut ForkAccess, props: &ToolProps) -> ToolResult {
    let tool_name = props.program.tool_name.as_str();
    fork.branch(tool_name, |run| {
        let var_bindings = relevant_var_bindings(run, props);
        let props = props.with_var_bindings(var_bindings);
        let memory = run.memory_slot();
        trace!(program = %props.program.summary(), "running tool");
        props.registry.lookup(tool_name).run(&memory, &props)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceCollection;
    use crate::registry::ToolRegistry;
    use crate::tool::{Tool, VarBinding};
    use splice_promise::EagerPromise;
    use splice_types::{Program, ToolOutput, Var, VarId};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts its runs and how many runs its own memory has seen
    struct Counter {
        runs: Rc<Cell<usize>>,
        name: &'static str,
    }

    impl Tool for Counter {
        fn make_program(&self, _default_input: Option<&str>) -> Program {
            Program::new(self.name)
        }

        fn references(&self, program: &Program) -> ReferenceCollection {
            match program.field("ref").and_then(|r| r.as_str()) {
                Some(id) => ReferenceCollection::var(id),
                None => ReferenceCollection::none(),
            }
        }

        fn run(&self, memory: &Memory, _props: &ToolProps) -> ToolResult {
            self.runs.set(self.runs.get() + 1);
            let seen = run_incremental(memory, |run| {
                let seen = run.slot(|| 0);
                *seen.borrow_mut() += 1;
                seen.get()
            });
            ToolResult::value(seen)
        }
    }

    fn registry(runs: &Rc<Cell<usize>>) -> Rc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for name in ["first", "second"] {
            registry
                .register(Rc::new(Counter {
                    runs: runs.clone(),
                    name,
                }))
                .unwrap();
        }
        Rc::new(registry)
    }

    fn value(result: &ToolResult) -> Option<serde_json::Value> {
        result.output.state().value().map(|output| output.value.clone())
    }

    #[test]
    fn test_run_tool_runs_every_time_on_kept_memory() {
        let runs = Rc::new(Cell::new(0));
        let registry = registry(&runs);
        let memory = Memory::new();

        let props = ToolProps::new(Program::new("first"), VarBindings::new(), registry.clone());
        assert_eq!(value(&run_program(&memory, &props)), Some(1.into()));
        assert_eq!(value(&run_program(&memory, &props.clone())), Some(2.into()));
        assert_eq!(runs.get(), 2);
    }

    /// Reports whether `input` has settled yet
    struct Peek;

    impl Tool for Peek {
        fn make_program(&self, _default_input: Option<&str>) -> Program {
            Program::new("peek")
        }

        fn references(&self, _program: &Program) -> ReferenceCollection {
            ReferenceCollection::var("input")
        }

        fn run(&self, _memory: &Memory, props: &ToolProps) -> ToolResult {
            let status = props
                .var_bindings
                .get(&VarId::from("input"))
                .map(|binding| binding.output.state().status())
                .unwrap_or("missing");
            ToolResult::value(status)
        }
    }

    #[test]
    fn test_rerun_after_input_settles_sees_new_state() {
        let mut registry = ToolRegistry::new();
        registry.register(Rc::new(Peek)).unwrap();
        let (input, resolver) = EagerPromise::pending();
        let bindings: VarBindings = vec![Rc::new(VarBinding::new(Var::new("input", "input"), input))]
            .into_iter()
            .collect();
        let props = ToolProps::new(Program::new("peek"), bindings, Rc::new(registry));
        let memory = Memory::new();

        assert_eq!(value(&run_program(&memory, &props)), Some("pending".into()));
        resolver.resolve(ToolOutput::new(1));
        assert_eq!(value(&run_program(&memory, &props)), Some("fulfilled".into()));
    }

    #[test]
    fn test_tool_sees_only_referenced_bindings() {
        let binding = |id: &str| {
            Rc::new(VarBinding::new(Var::new(id, id), EagerPromise::resolve(ToolOutput::new(0))))
        };

        struct Scope;
        impl Tool for Scope {
            fn make_program(&self, _default_input: Option<&str>) -> Program {
                Program::new("scope")
            }
            fn references(&self, _program: &Program) -> ReferenceCollection {
                ReferenceCollection::var("input")
            }
            fn run(&self, _memory: &Memory, props: &ToolProps) -> ToolResult {
                let ids: Vec<&str> = props.var_bindings.ids().map(VarId::as_str).collect();
                ToolResult::value(ids.join(","))
            }
        }
        let mut registry = ToolRegistry::new();
        registry.register(Rc::new(Scope)).unwrap();

        let bindings: VarBindings = vec![binding("input"), binding("other")].into_iter().collect();
        let props = ToolProps::new(Program::new("scope"), bindings, Rc::new(registry));
        assert_eq!(value(&run_program(&Memory::new(), &props)), Some("input".into()));
    }

    #[test]
    fn test_switching_tools_starts_fresh() {
        let runs = Rc::new(Cell::new(0));
        let registry = registry(&runs);
        let memory = Memory::new();
        let props = |name: &str, n: i64| {
            ToolProps::new(Program::new(name).with("n", n), VarBindings::new(), registry.clone())
        };

        run_program(&memory, &props("first", 1));
        assert_eq!(value(&run_program(&memory, &props("first", 2))), Some(2.into()));
        assert_eq!(value(&run_program(&memory, &props("second", 3))), Some(1.into()));
        assert_eq!(value(&run_program(&memory, &props("first", 4))), Some(1.into()));
    }

    #[test]
    fn test_run_sub_tool() {
        let runs = Rc::new(Cell::new(0));
        let registry = registry(&runs);
        let parent = Program::new("parent").with_program("child", &Program::new("second"));
        let props = ToolProps::new(parent, VarBindings::new(), registry);

        let memory = Memory::new();
        let found = run_incremental(&memory, |run| run_sub_tool(run, &props, "child"));
        assert_eq!(value(&found), Some(1.into()));

        let missing = run_incremental(&Memory::new(), |run| run_sub_tool(run, &props, "nope"));
        assert_eq!(
            missing.output.state().reason(),
            Some(&ToolError::MissingProgram { key: "nope".into() })
        );
    }

    #[test]
    fn test_relevant_var_bindings() {
        let runs = Rc::new(Cell::new(0));
        let registry = registry(&runs);
        let binding = |id: &str| {
            Rc::new(VarBinding::new(
                Var::new(id, id),
                EagerPromise::resolve(ToolOutput::new(0)),
            ))
        };
        let a = binding("a");
        let program = Program::new("first").with("ref", "a");
        let memory = Memory::new();

        let pick = |bindings: VarBindings| {
            let props = ToolProps::new(program.clone(), bindings, registry.clone());
            run_incremental(&memory, |run| relevant_var_bindings(run, &props))
        };

        let first = pick(vec![a.clone(), binding("b")].into_iter().collect());
        let second = pick(vec![a, binding("c")].into_iter().collect());

        assert_eq!(first.ids().collect::<Vec<_>>(), vec![&VarId::from("a")]);
        assert!(first.ptr_eq(&second));
    }
}
