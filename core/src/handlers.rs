//! Named handler bodies, populated once when a document loads

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::CommandNode;

/// A named, top-level command sequence run in response to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    pub name: String,
    pub body: Vec<CommandNode>,
}

impl Handler {
    pub fn new(name: impl Into<String>, body: Vec<CommandNode>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Build from a `<Handler name="..">` element; its children are the body
    pub fn from_node(node: &CommandNode) -> Option<Handler> {
        let name = node.attr("name")?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Handler::new(name, node.children.clone()))
    }
}

/// Handler name → body. Names are exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the one it replaced (last declaration wins)
    pub fn register(&mut self, handler: Handler) -> Option<Handler> {
        self.handlers.insert(handler.name.clone(), handler)
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
