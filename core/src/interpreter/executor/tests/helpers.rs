//! Test helpers for dispatcher tests
//!
//! A `Harness` owns everything a `Dispatcher` borrows, so each test gets a
//! fresh state store and host.

use crate::config::InterpreterConfig;
use crate::errors::ExecResult;
use crate::handlers::{Handler, HandlerRegistry};
use crate::host::{MemoryHost, WidgetRef};
use crate::interpreter::executor::{Dispatcher, InvokeOutcome};
use crate::state::StateStore;
use crate::types::{CommandNode, Scalar};
use std::collections::HashMap;

pub struct Harness {
    pub state: StateStore,
    pub handlers: HandlerRegistry,
    pub host: MemoryHost,
    pub limits: InterpreterConfig,
}

impl Harness {
    /// Harness over a permissive host (every widget name resolves)
    pub fn new() -> Self {
        Self::with_host(MemoryHost::permissive())
    }

    pub fn with_host(host: MemoryHost) -> Self {
        Self {
            state: StateStore::new(),
            handlers: HandlerRegistry::new(),
            host,
            limits: InterpreterConfig::default(),
        }
    }

    pub fn handler(mut self, name: &str, body: Vec<CommandNode>) -> Self {
        self.handlers.register(Handler::new(name, body));
        self
    }

    /// Execute nodes directly, without the invoke-level fault guard
    pub fn run(&mut self, nodes: &[CommandNode]) -> ExecResult {
        self.run_as(nodes, None)
    }

    pub fn run_as(&mut self, nodes: &[CommandNode], sender: Option<&WidgetRef>) -> ExecResult {
        let mut dispatcher =
            Dispatcher::new(&mut self.state, &self.handlers, &mut self.host, &self.limits);
        dispatcher.execute_all(nodes, sender)
    }

    pub fn invoke(&mut self, name: &str) -> InvokeOutcome {
        let mut dispatcher =
            Dispatcher::new(&mut self.state, &self.handlers, &mut self.host, &self.limits);
        dispatcher.invoke(name, None)
    }

    pub fn var(&self, name: &str) -> Option<Scalar> {
        self.state.get(name).cloned()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.state.get(name).map(|v| v.to_string())
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.host.logs.iter().any(|(_, line)| line.contains(needle))
    }
}

/// Build a command node from a tag and an attribute map
pub fn cmd(tag: &str, attrs: HashMap<&str, &str>) -> CommandNode {
    let attributes = attrs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    CommandNode::new(tag).with_attrs(attributes)
}

/// Wrap nodes in a structural child such as `Then` or `Catch`
pub fn block(tag: &str, children: Vec<CommandNode>) -> CommandNode {
    CommandNode::new(tag).with_children(children)
}

/// Parse a command node from its JSON document form
pub fn from_json(json: &str) -> CommandNode {
    serde_json::from_str(json).expect("Command node deserialization failed")
}
