//! Host-facing entry points
//!
//! A `Runtime` owns the state store, the handler registry and the host. The
//! host loads a document once, then calls `invoke` for every event.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

use crate::config::InterpreterConfig;
use crate::document::Document;
use crate::errors::ExecResult;
use crate::handlers::HandlerRegistry;
use crate::host::{HostBridge, WidgetRef};
use crate::interpreter::executor::{Dispatcher, InvokeOutcome};
use crate::state::StateStore;
use crate::types::{CommandNode, Scalar};

pub struct Runtime<H: HostBridge> {
    state: StateStore,
    handlers: HandlerRegistry,
    host: H,
    limits: InterpreterConfig,
    version_hash: Option<String>,
}

impl<H: HostBridge> Runtime<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, InterpreterConfig::default())
    }

    pub fn with_config(host: H, limits: InterpreterConfig) -> Self {
        Self {
            state: StateStore::new(),
            handlers: HandlerRegistry::new(),
            host,
            limits,
            version_hash: None,
        }
    }

    /* ===================== Loading ===================== */

    /// Declare the document's variables and register its handlers
    ///
    /// Loading is additive: variables are (re)set, handlers with an existing
    /// name replace the earlier one.
    pub fn load_document(&mut self, document: &Document) {
        for decl in &document.variables {
            self.state.set(decl.name.as_str(), decl.value.clone());
        }
        for handler in &document.handlers {
            if self.handlers.register(handler.clone()).is_some() {
                warn!(handler = %handler.name, "Handler redeclared; last declaration wins");
            }
        }
        if document.version_hash.is_some() {
            self.version_hash = document.version_hash.clone();
        }

        info!(
            variables = document.variables.len(),
            handlers = document.handlers.len(),
            version = self.version_hash.as_deref().map(|h| &h[..8.min(h.len())]),
            "Loaded document"
        );
    }

    /// Load an already-parsed tree
    pub fn load_tree(&mut self, root: &CommandNode) -> Document {
        let document = Document::from_root(root);
        self.load_document(&document);
        document
    }

    /// Parse markup or JSON source and load it
    pub fn load_source(&mut self, source: &str) -> Result<Document> {
        let document = Document::parse(source)?;
        self.load_document(&document);
        Ok(document)
    }

    /* ===================== Execution ===================== */

    /// Run a handler for a host event; never fails
    pub fn invoke(&mut self, name: &str, sender: Option<&WidgetRef>) -> InvokeOutcome {
        let span = info_span!("invoke", handler = name);
        let _enter = span.enter();

        let mut dispatcher =
            Dispatcher::new(&mut self.state, &self.handlers, &mut self.host, &self.limits);
        dispatcher.invoke(name, sender)
    }

    /// Execute one command outside any handler (faults are returned, not logged)
    pub fn execute(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let mut dispatcher =
            Dispatcher::new(&mut self.state, &self.handlers, &mut self.host, &self.limits);
        dispatcher.execute(node, sender)
    }

    /* ===================== Introspection ===================== */

    /// Every variable, ordered by name
    pub fn state_snapshot(&self) -> BTreeMap<String, Scalar> {
        self.state.snapshot()
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn limits(&self) -> &InterpreterConfig {
        &self.limits
    }

    pub fn version_hash(&self) -> Option<&str> {
        self.version_hash.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    const COUNTER: &str = r#"
        <Window>
            <Variable name="cnt" value="0" />
            <Label name="lbl" />
            <Handler name="Add">
                <Increment var="cnt" by="1" />
                <Set target="lbl" property="Text" value="{cnt}" />
            </Handler>
        </Window>
    "#;

    #[test]
    fn test_counter_document_end_to_end() {
        let mut runtime = Runtime::new(MemoryHost::new().with_widget("lbl"));
        runtime.load_source(COUNTER).unwrap();

        for _ in 0..3 {
            assert_eq!(runtime.invoke("Add", None), InvokeOutcome::Completed);
        }

        assert_eq!(runtime.state().get("cnt"), Some(&Scalar::Float(3.0)));
        assert_eq!(runtime.host().property_text("lbl", "Text"), Some("3".to_string()));
        assert_eq!(runtime.version_hash().map(str::len), Some(64));
    }

    #[test]
    fn test_absent_score_takes_else_branch() {
        let source = r#"
            <App>
                <Handler name="Grade">
                    <If condition="{score} >= 10">
                        <Then><Set var="grade" value="pass" /></Then>
                        <Else><Set var="grade" value="fail" /></Else>
                    </If>
                </Handler>
            </App>
        "#;
        let mut runtime = Runtime::new(MemoryHost::new());
        runtime.load_source(source).unwrap();

        runtime.invoke("Grade", None);

        assert_eq!(
            runtime.state_snapshot().get("grade"),
            Some(&Scalar::Str("fail".to_string()))
        );
    }

    #[test]
    fn test_redeclared_handler_last_wins() {
        let source = r#"
            <App>
                <Handler name="Go"><Set var="v" value="first" /></Handler>
                <Handler name="Go"><Set var="v" value="second" /></Handler>
            </App>
        "#;
        let mut runtime = Runtime::new(MemoryHost::new());
        let document = runtime.load_source(source).unwrap();
        assert_eq!(document.handlers.len(), 2);
        assert_eq!(runtime.handlers().len(), 1);

        runtime.invoke("Go", None);

        assert_eq!(runtime.state().get("v"), Some(&Scalar::Str("second".to_string())));
    }

    #[test]
    fn test_snapshot_is_sorted_copy() {
        let mut runtime = Runtime::new(MemoryHost::new());
        runtime.state_mut().set("b", 2_i64);
        runtime.state_mut().set("a", 1_i64);

        let snapshot = runtime.state_snapshot();
        let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_execute_returns_faults() {
        let mut runtime = Runtime::new(MemoryHost::new());
        let err = runtime
            .execute(&CommandNode::new("Throw").with_attr("message", "nope"), None)
            .unwrap_err();
        assert_eq!(err.message(), "nope");
    }

    #[test]
    fn test_loop_ceiling_from_config() {
        let limits = InterpreterConfig {
            max_loop_iterations: 3,
            ..InterpreterConfig::default()
        };
        let mut runtime = Runtime::with_config(MemoryHost::new(), limits);
        let node = CommandNode::new("While")
            .with_attr("condition", "1")
            .with_child(CommandNode::new("Increment").with_attr("var", "n"));

        runtime.execute(&node, None).unwrap();

        assert_eq!(runtime.state().get("n"), Some(&Scalar::Float(3.0)));
    }
}
