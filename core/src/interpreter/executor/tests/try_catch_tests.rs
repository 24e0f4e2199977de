//! Tests for TryCatch / Throw and fault propagation

use super::helpers::{block, cmd, Harness};
use crate::host::MemoryHost;
use crate::interpreter::executor::InvokeOutcome;
use crate::types::CommandNode;
use maplit::hashmap;

fn failing_navigate() -> CommandNode {
    cmd("Navigate", hashmap! { "to" => "Settings" })
}

#[test]
fn test_host_fault_runs_catch_once_and_sets_error() {
    let mut h = Harness::with_host(MemoryHost::permissive().fail_on("navigate", "no route"));
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![
            failing_navigate(),
            cmd("Set", hashmap! { "var" => "unreached", "value" => "1" }),
        ]),
        block("Catch", vec![cmd("Increment", hashmap! { "var" => "catches" })]),
        block("Finally", vec![cmd("Set", hashmap! { "var" => "cleaned", "value" => "yes" })]),
    ]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("error"), Some("no route".to_string()));
    assert_eq!(h.text("catches"), Some("1".to_string()));
    assert_eq!(h.text("cleaned"), Some("yes".to_string()));
    assert!(h.var("unreached").is_none());
}

#[test]
fn test_finally_runs_without_catch() {
    let mut h = Harness::with_host(MemoryHost::permissive().fail_on("navigate", "no route"));
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![failing_navigate()]),
        block("Finally", vec![cmd("Set", hashmap! { "var" => "cleaned", "value" => "yes" })]),
    ]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("error"), Some("no route".to_string()));
    assert_eq!(h.text("cleaned"), Some("yes".to_string()));
}

#[test]
fn test_finally_runs_on_success_and_catch_does_not() {
    let mut h = Harness::new();
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![cmd("Set", hashmap! { "var" => "done", "value" => "1" })]),
        block("Catch", vec![cmd("Set", hashmap! { "var" => "caught", "value" => "1" })]),
        block("Finally", vec![cmd("Set", hashmap! { "var" => "cleaned", "value" => "1" })]),
    ]);

    h.run(&[node]).unwrap();

    assert!(h.var("done").is_some());
    assert!(h.var("caught").is_none());
    assert!(h.var("cleaned").is_some());
    assert!(h.var("error").is_none());
}

#[test]
fn test_custom_error_variable_and_throw() {
    let mut h = Harness::new();
    let node = cmd("TryCatch", hashmap! { "errorVar" => "why" }).with_children(vec![
        cmd("Throw", hashmap! { "message" => "bad input {field}" }),
        block("Catch", vec![cmd("Set", hashmap! { "var" => "msg", "value" => "caught: {why}" })]),
    ]);
    h.state.set("field", "email");

    h.run(&[node]).unwrap();

    assert_eq!(h.text("why"), Some("bad input email".to_string()));
    assert_eq!(h.text("msg"), Some("caught: bad input email".to_string()));
}

#[test]
fn test_default_error_variable_comes_from_config() {
    let mut h = Harness::new();
    h.limits.default_error_variable = "lastError".to_string();
    let node = CommandNode::new("TryCatch")
        .with_child(block("Try", vec![CommandNode::new("Throw").with_text("oops")]));

    h.run(&[node]).unwrap();

    assert_eq!(h.text("lastError"), Some("oops".to_string()));
}

#[test]
fn test_fault_in_catch_propagates_after_finally() {
    let mut h = Harness::new();
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![cmd("Throw", hashmap! { "message" => "first" })]),
        block("Catch", vec![cmd("Throw", hashmap! { "message" => "second" })]),
        block("Finally", vec![cmd("Set", hashmap! { "var" => "cleaned", "value" => "1" })]),
    ]);

    let err = h.run(&[node]).unwrap_err();

    assert_eq!(err.message(), "second");
    assert!(h.var("cleaned").is_some());
}

#[test]
fn test_fault_in_finally_wins() {
    let mut h = Harness::new();
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![cmd("Throw", hashmap! { "message" => "first" })]),
        block("Catch", vec![cmd("Throw", hashmap! { "message" => "second" })]),
        block("Finally", vec![cmd("Throw", hashmap! { "message" => "third" })]),
    ]);

    let err = h.run(&[node]).unwrap_err();

    assert_eq!(err.message(), "third");
}

#[test]
fn test_nested_try_catch_inner_handles() {
    let mut h = Harness::new();
    let inner = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![cmd("Throw", hashmap! { "message" => "inner" })]),
        block("Catch", vec![cmd("Set", hashmap! { "var" => "handled", "value" => "inner" })]),
    ]);
    let outer = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![inner]),
        block("Catch", vec![cmd("Set", hashmap! { "var" => "handled", "value" => "outer" })]),
    ]);

    h.run(&[outer]).unwrap();

    assert_eq!(h.text("handled"), Some("inner".to_string()));
}

#[test]
fn test_uncaught_fault_is_contained_by_invoke() {
    let mut h = Harness::new().handler(
        "Broken",
        vec![
            cmd("Set", hashmap! { "var" => "before", "value" => "1" }),
            cmd("Throw", hashmap! { "message" => "kaboom" }),
            cmd("Set", hashmap! { "var" => "after", "value" => "1" }),
        ],
    );

    let outcome = h.invoke("Broken");

    assert_eq!(outcome, InvokeOutcome::Faulted("kaboom".to_string()));
    assert!(h.var("before").is_some());
    assert!(h.var("after").is_none());
    assert!(h.logged("Handler `Broken` failed: kaboom"));
}

#[test]
fn test_plugin_command_fault_is_catchable() {
    let host = MemoryHost::permissive()
        .with_plugin_command("PlaySound")
        .fail_on("PlaySound", "no audio device");
    let mut h = Harness::with_host(host);
    let node = CommandNode::new("TryCatch").with_children(vec![
        block("Try", vec![CommandNode::new("PlaySound")]),
        block("Catch", vec![]),
    ]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("error"), Some("no audio device".to_string()));
}
