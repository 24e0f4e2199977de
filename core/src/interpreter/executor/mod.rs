//! Command dispatcher
//!
//! Walks a handler's command nodes one at a time, dispatching by tag.
//! Leaf commands live in `statements`, control-flow commands in `control`.
//!
//! A `Dispatcher` borrows the state, the handler registry, the host and the
//! limits for the duration of one top-level invocation. Nested `Call`s and
//! host events pumped during `Delay` re-enter the same dispatcher, so there
//! is no re-entrancy guard and mutual handler recursion is unbounded.

use serde::Serialize;
use tracing::{debug, error};

use super::binding::BindingResolver;
use crate::config::InterpreterConfig;
use crate::errors::{ExecResult, Fault};
use crate::handlers::HandlerRegistry;
use crate::host::{find_widget, HostBridge, LogLevel, WidgetRef};
use crate::state::StateStore;
use crate::types::CommandNode;

pub mod commands;
mod control;
mod statements;

#[cfg(test)]
mod tests;

pub use commands::Command;

/// Result of a top-level handler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum InvokeOutcome {
    /// The handler ran to the end
    Completed,
    /// A fault escaped every `TryCatch`; it was logged and swallowed
    Faulted(String),
    /// No handler is registered under that name
    UnknownHandler,
}

impl InvokeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvokeOutcome::Completed)
    }
}

pub struct Dispatcher<'a> {
    state: &'a mut StateStore,
    handlers: &'a HandlerRegistry,
    host: &'a mut dyn HostBridge,
    limits: &'a InterpreterConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        state: &'a mut StateStore,
        handlers: &'a HandlerRegistry,
        host: &'a mut dyn HostBridge,
        limits: &'a InterpreterConfig,
    ) -> Self {
        Self {
            state,
            handlers,
            host,
            limits,
        }
    }

    /// Run the named handler; faults are caught here and reported to the host
    pub fn invoke(&mut self, name: &str, sender: Option<&WidgetRef>) -> InvokeOutcome {
        // Copy the registry reference out so the handler body does not borrow `self`
        let handlers: &'a HandlerRegistry = self.handlers;

        let Some(handler) = handlers.get(name) else {
            self.report(LogLevel::Warn, format!("No handler named `{}`", name));
            return InvokeOutcome::UnknownHandler;
        };

        match self.execute_all(&handler.body, sender) {
            Ok(()) => InvokeOutcome::Completed,
            Err(fault) => {
                error!(handler = name, "Handler faulted: {}", fault);
                self.host
                    .log(LogLevel::Error, &format!("Handler `{}` failed: {}", name, fault));
                InvokeOutcome::Faulted(fault.to_string())
            }
        }
    }

    /// Execute a single command node
    pub fn execute(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let command = Command::from_tag(&node.tag);
        debug!(
            tag = %node.tag,
            control_flow = command.is_control_flow(),
            "Dispatching command"
        );

        match command {
            Command::Set => self.exec_set(node, sender),
            Command::SetVar => self.exec_set_var(node, sender),
            Command::Get => self.exec_get(node, sender),
            Command::Increment | Command::Decrement | Command::Multiply | Command::Divide => {
                self.exec_arithmetic(command, node, sender)
            }
            Command::Calculate => self.exec_calculate(node, sender),
            Command::Toggle => self.exec_toggle(node, sender),
            Command::Append => self.exec_append(node, sender),
            Command::Clear => self.exec_clear(node, sender),

            Command::Substring => self.exec_substring(node, sender),
            Command::Replace => self.exec_replace(node, sender),
            Command::ToUpper | Command::ToLower | Command::Length => {
                self.exec_text_transform(command, node, sender)
            }
            Command::NewGuid => self.exec_new_guid(node, sender),
            Command::Now => self.exec_now(node, sender),
            Command::CallFunction => self.exec_call_function(node, sender),

            Command::Show | Command::Hide | Command::Enable | Command::Disable => {
                self.exec_widget_flag(command, node, sender)
            }
            Command::CopyProperty => self.exec_copy_property(node, sender),
            Command::Navigate => self.exec_navigate(node, sender),
            Command::OpenWindow => self.exec_open_window(node, sender),
            Command::CloseWindow => self.exec_close_window(node, sender),
            Command::CopyToClipboard => self.exec_copy_to_clipboard(node, sender),
            Command::PasteFromClipboard => self.exec_paste_from_clipboard(node, sender),
            Command::Alert => self.exec_alert(node, sender),
            Command::Log => self.exec_log(node, sender),
            Command::Delay => self.exec_delay(node, sender),

            Command::If => self.exec_if(node, sender),
            Command::Switch => self.exec_switch(node, sender),
            Command::ForEach => self.exec_for_each(node, sender),
            Command::While => self.exec_while(node, sender),
            Command::TryCatch => self.exec_try_catch(node, sender),
            Command::Call => self.exec_call(node, sender),
            Command::Sequence => self.execute_all(&node.children, sender),
            Command::Throw => self.exec_throw(node, sender),

            Command::Unknown => self.exec_plugin(node, sender),
        }
    }

    /// Execute nodes in order, stopping at the first fault
    pub fn execute_all<'n>(
        &mut self,
        nodes: impl IntoIterator<Item = &'n CommandNode>,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        for node in nodes {
            self.execute(node, sender)?;
        }
        Ok(())
    }

    /// Unknown tags go to the host; still unhandled means warn and skip
    fn exec_plugin(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        match self.host.resolve_plugin_command(node, sender) {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.report(
                    LogLevel::Warn,
                    format!("Unknown command `{}` skipped", node.tag),
                );
                Ok(())
            }
            Err(err) => Err(Fault::Plugin {
                tag: node.tag.clone(),
                message: format!("{:#}", err),
            }),
        }
    }

    /* ===================== Helpers ===================== */

    fn resolver<'s>(&'s self, sender: Option<&'s WidgetRef>) -> BindingResolver<'s> {
        BindingResolver::new(&*self.state, &*self.host, sender)
    }

    /// Attribute value with bindings resolved
    fn attr(&self, node: &CommandNode, name: &str, sender: Option<&WidgetRef>) -> Option<String> {
        let raw = node.attr(name)?;
        Some(self.resolver(sender).resolve(raw).into_owned())
    }

    /// First present attribute among `names`, with bindings resolved
    fn attr_any(
        &self,
        node: &CommandNode,
        names: &[&str],
        sender: Option<&WidgetRef>,
    ) -> Option<String> {
        let raw = node.attr_any(names)?;
        Some(self.resolver(sender).resolve(raw).into_owned())
    }

    /// Target variable name (`var`, or `name` as an alias)
    fn var_name(&self, node: &CommandNode, sender: Option<&WidgetRef>) -> Option<String> {
        self.attr_any(node, &["var", "name"], sender)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Look a widget up by (resolved) name; a missing widget is reported
    fn lookup_widget(&mut self, name: &str, sender: Option<&WidgetRef>) -> Option<WidgetRef> {
        let found = find_widget(&*self.host, name, sender);
        if found.is_none() {
            self.report(LogLevel::Warn, format!("Widget `{}` not found", name.trim()));
        }
        found
    }

    fn report(&mut self, level: LogLevel, message: String) {
        self.host.log(level, &message);
    }
}
