//! Control-flow commands
//!
//! Supports:
//! - If with Then/ElseIf/Else (bare children act as Then)
//! - Switch with Case/Default, first match wins
//! - ForEach over a count or a comma-separated list
//! - While with an iteration ceiling
//! - TryCatch with Try/Catch/Finally
//! - Call into another handler
//! - Delay, pumping host events while it waits

use std::thread;
use std::time::{Duration, Instant};

use super::Dispatcher;
use crate::errors::ExecResult;
use crate::host::{LogLevel, WidgetRef};
use crate::interpreter::condition::evaluate_condition;
use crate::types::{coerce_f64, CommandNode, Scalar};

const BRANCH_TAGS: &[&str] = &["Then", "ElseIf", "Else"];
const TRY_TAGS: &[&str] = &["Catch", "Finally"];

impl<'a> Dispatcher<'a> {
    fn condition_holds(&self, node: &CommandNode, sender: Option<&WidgetRef>) -> bool {
        let raw = node.attr("condition").unwrap_or_default();
        evaluate_condition(raw, &self.resolver(sender))
    }

    /* ===================== Branches ===================== */

    /// Exactly one branch runs, or none when nothing matches and there is no `Else`
    pub(super) fn exec_if(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        if self.condition_holds(node, sender) {
            return match node.child("Then") {
                Some(then) => self.execute_all(&then.children, sender),
                None => self.execute_all(node.children_except(BRANCH_TAGS), sender),
            };
        }

        for branch in node.children_tagged("ElseIf") {
            if self.condition_holds(branch, sender) {
                return self.execute_all(&branch.children, sender);
            }
        }

        match node.child("Else") {
            Some(otherwise) => self.execute_all(&otherwise.children, sender),
            None => Ok(()),
        }
    }

    /// Compare the resolved `value` against each `Case` as trimmed text
    pub(super) fn exec_switch(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let subject = self.attr(node, "value", sender).unwrap_or_default();
        let subject = subject.trim();

        for case in node.children_tagged("Case") {
            let candidate = self.attr(case, "value", sender).unwrap_or_default();
            if candidate.trim() == subject {
                return self.execute_all(&case.children, sender);
            }
        }

        match node.child("Default") {
            Some(default) => self.execute_all(&default.children, sender),
            None => Ok(()),
        }
    }

    /* ===================== Loops ===================== */

    /// `ForEach count=N` sets item/index to 0..N-1; `ForEach items="a,b"`
    /// sets item to each non-empty trimmed token
    pub(super) fn exec_for_each(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let item_var = self
            .attr_any(node, &["item", "var"], sender)
            .unwrap_or_else(|| "item".to_string());
        let index_var = self
            .attr(node, "index", sender)
            .unwrap_or_else(|| "index".to_string());

        if let Some(count) = self.attr(node, "count", sender) {
            let count = coerce_f64(&count);
            let count = if count.is_finite() && count > 0.0 {
                count.trunc() as i64
            } else {
                0
            };
            for i in 0..count {
                self.state.set(index_var.as_str(), i);
                self.state.set(item_var.as_str(), i);
                self.execute_all(&node.children, sender)?;
            }
            return Ok(());
        }

        let items = self.attr_any(node, &["items", "in"], sender).unwrap_or_default();
        let tokens = items.split(',').map(str::trim).filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            self.state.set(index_var.as_str(), i as i64);
            self.state.set(item_var.as_str(), Scalar::Str(token.to_string()));
            self.execute_all(&node.children, sender)?;
        }
        Ok(())
    }

    /// The condition is re-checked before every iteration. Reaching the
    /// ceiling is reported and execution continues after the loop.
    pub(super) fn exec_while(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let ceiling = self.limits.max_loop_iterations;
        let mut iterations: u64 = 0;

        while self.condition_holds(node, sender) {
            if iterations >= ceiling {
                self.report(
                    LogLevel::Warn,
                    format!("While loop stopped after {} iterations", ceiling),
                );
                break;
            }
            self.execute_all(&node.children, sender)?;
            iterations += 1;
        }
        Ok(())
    }

    /* ===================== Faults ===================== */

    /// A fault in `Try` is stored in the error variable and `Catch` runs.
    /// `Finally` always runs; a fault it raises replaces any earlier one.
    pub(super) fn exec_try_catch(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let error_var = self
            .attr_any(node, &["errorVar", "errorVariable"], sender)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.limits.default_error_variable.clone());

        let attempt = match node.child("Try") {
            Some(body) => self.execute_all(&body.children, sender),
            None => self.execute_all(node.children_except(TRY_TAGS), sender),
        };

        let outcome = match attempt {
            Ok(()) => Ok(()),
            Err(fault) => {
                self.report(LogLevel::Debug, format!("Caught fault: {}", fault));
                self.state.set(error_var, fault.message());
                match node.child("Catch") {
                    Some(catch) => self.execute_all(&catch.children, sender),
                    None => Ok(()),
                }
            }
        };

        if let Some(finally) = node.child("Finally") {
            self.execute_all(&finally.children, sender)?;
        }
        outcome
    }

    /* ===================== Re-entry ===================== */

    /// Run another handler in place; its faults propagate to the caller
    pub(super) fn exec_call(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(name) = self.attr_any(node, &["handler", "name"], sender) else {
            return Ok(());
        };
        let handlers: &'a _ = self.handlers;

        match handlers.get(name.trim()) {
            Some(handler) => self.execute_all(&handler.body, sender),
            None => {
                self.report(
                    LogLevel::Warn,
                    format!("Call to unknown handler `{}` skipped", name.trim()),
                );
                Ok(())
            }
        }
    }

    /// Wait `ms` (clamped), pumping host events in slices
    ///
    /// Each pumped event runs as its own guarded invocation, so its faults
    /// are logged and never reach the handler that is waiting.
    pub(super) fn exec_delay(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let requested = self
            .attr_any(node, &["ms", "milliseconds"], sender)
            .map(|ms| coerce_f64(&ms))
            .unwrap_or(0.0);
        let ms = if requested.is_finite() && requested > 0.0 {
            (requested as u64).min(self.limits.max_delay_ms)
        } else {
            0
        };

        let deadline = Instant::now() + Duration::from_millis(ms);
        let slice = Duration::from_millis(self.limits.pump_interval_ms.max(1));

        loop {
            for event in self.host.pump_events() {
                self.invoke(&event.handler, event.sender.as_ref());
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}
