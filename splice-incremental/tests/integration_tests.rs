//! Integration tests for the incremental substrate

use splice_incremental::eq::ref_eq;
use splice_incremental::prelude::*;
use splice_promise::EagerPromise;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Each keyed branch counts how many times it has run since it was created.
fn counting_branches(memory: &Memory, keys: &[&str]) -> Vec<(String, u32)> {
    run_incremental(memory, |run| {
        run.fork_each(|fork| {
            keys.iter()
                .map(|key| {
                    let runs = fork.branch(key, |run| {
                        let runs = run.slot(|| 0u32);
                        *runs.borrow_mut() += 1;
                        runs.get()
                    });
                    (key.to_string(), runs)
                })
                .collect()
        })
    })
}

fn render(result: &[(String, u32)]) -> String {
    result
        .iter()
        .map(|(key, runs)| format!("{}={}", key, runs))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_fork_pruning_resets_absent_branch() {
    let memory = Memory::new();

    let first = counting_branches(&memory, &["A", "B"]);
    let second = counting_branches(&memory, &["A"]);
    let third = counting_branches(&memory, &["A", "B"]);

    insta::assert_snapshot!(render(&first), @"A=1 B=1");
    insta::assert_snapshot!(render(&second), @"A=2");
    insta::assert_snapshot!(render(&third), @"A=3 B=1");
}

#[test]
fn test_fork_survives_reorder_and_growth() {
    let memory = Memory::new();
    counting_branches(&memory, &["x", "y"]);
    let result = counting_branches(&memory, &["z", "y", "x"]);
    insta::assert_snapshot!(render(&result), @"z=1 y=2 x=2");
}

#[test]
fn test_nested_slots_stay_identical_under_forks() {
    let memory = Memory::new();
    let grab = |memory: &Memory| {
        run_incremental(memory, |run| {
            let top = run.slot(Vec::<u8>::new);
            let inner = run.fork_each(|fork| fork.branch("only", |run| run.slot(|| 'c')));
            (top, inner)
        })
    };

    let (top1, inner1) = grab(&memory);
    let (top2, inner2) = grab(&memory);
    assert!(top1.ptr_eq(&top2));
    assert!(inner1.ptr_eq(&inner2));
}

#[test]
fn test_later_inside_promise_continuation() {
    let memory = Memory::new();
    let computed = Rc::new(Cell::new(0));

    let body = |input: EagerPromise<i32, String>| {
        let computed = computed.clone();
        run_incremental(&memory, move |run| {
            let later = run.later();
            input.map(move |value| {
                later.run(|run| {
                    run.memo(value, |_| {
                        computed.set(computed.get() + 1);
                        value + 1
                    })
                })
            })
        })
    };

    let (pending, resolver) = EagerPromise::pending();
    let output = body(pending);
    assert!(output.is_pending());
    resolver.resolve(1);
    assert_eq!(output.state().value(), Some(&2));

    let again = body(EagerPromise::resolve(1));
    assert_eq!(again.state().value(), Some(&2));
    assert_eq!(computed.get(), 1);
}

#[test]
fn test_memoize_by_reference_equality() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let log = calls.clone();
    let describe = memoize_by(
        move |_memory: &Memory, items: Rc<Vec<&'static str>>| {
            log.borrow_mut().push(items.len());
            items.join("+")
        },
        ref_eq,
    );

    let memory = Memory::new();
    let items = Rc::new(vec!["a", "b"]);
    assert_eq!(describe(&memory, items.clone()), "a+b");
    assert_eq!(describe(&memory, items), "a+b");
    assert_eq!(describe(&memory, Rc::new(vec!["a", "b"])), "a+b");

    assert_eq!(*calls.borrow(), vec![2, 2]);
}
