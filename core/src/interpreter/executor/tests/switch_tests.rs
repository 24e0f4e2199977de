//! Tests for Switch / Case / Default

use super::helpers::{block, cmd, Harness};
use crate::types::CommandNode;
use maplit::hashmap;

fn set(var: &str, value: &str) -> CommandNode {
    cmd("Set", hashmap! { "var" => var, "value" => value })
}

fn case(value: &str, marker: &str) -> CommandNode {
    cmd("Case", hashmap! { "value" => value }).with_child(set("hit", marker))
}

#[test]
fn test_switch_first_matching_case_wins() {
    let mut h = Harness::new();
    h.state.set("mode", "edit");
    let node = cmd("Switch", hashmap! { "value" => "{mode}" }).with_children(vec![
        case("view", "view"),
        case("edit", "first"),
        case("edit", "second"),
        block("Default", vec![set("hit", "default")]),
    ]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("hit"), Some("first".to_string()));
}

#[test]
fn test_switch_falls_back_to_default() {
    let mut h = Harness::new();
    let node = cmd("Switch", hashmap! { "value" => "zzz" }).with_children(vec![
        case("a", "a"),
        block("Default", vec![set("hit", "default")]),
    ]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("hit"), Some("default".to_string()));
}

#[test]
fn test_switch_no_match_no_default_is_noop() {
    let mut h = Harness::new();
    let node = cmd("Switch", hashmap! { "value" => "zzz" })
        .with_children(vec![case("a", "a"), case("b", "b")]);

    h.run(&[node]).unwrap();

    assert!(h.state.is_empty());
}

#[test]
fn test_switch_case_values_are_resolved_and_trimmed() {
    let mut h = Harness::new();
    h.state.set("expected", "42");
    let node = cmd("Switch", hashmap! { "value" => " 42 " })
        .with_children(vec![case("{expected}", "bound")]);

    h.run(&[node]).unwrap();

    assert_eq!(h.text("hit"), Some("bound".to_string()));
}
