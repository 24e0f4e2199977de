//! Leaf commands: one state or host effect each
//!
//! Missing variables, widgets or properties never fault. The command either
//! does nothing or writes a default, and the miss is reported to the host log.
//! Only a host operation that returns an error becomes a `Fault`.

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use uuid::Uuid;

use super::{Command, Dispatcher};
use crate::errors::{ExecResult, Fault};
use crate::host::{HostValue, LogLevel, WidgetRef};
use crate::interpreter::expression::evaluate_expression;
use crate::interpreter::stdlib::call_builtin;
use crate::state::Arithmetic;
use crate::types::{coerce_f64, CommandNode, Scalar};

const DEFAULT_NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_PROPERTY: &str = "Text";

impl Dispatcher<'_> {
    /* ===================== Variables ===================== */

    /// `Set target=.. property=.. value=..` writes a widget property,
    /// `Set var=.. value=.. [type=..]` writes a variable (text unless typed)
    pub(super) fn exec_set(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let value = self.attr(node, "value", sender).unwrap_or_default();

        if let Some(target) = self.attr(node, "target", sender) {
            let property = self
                .attr(node, "property", sender)
                .unwrap_or_else(|| DEFAULT_PROPERTY.to_string());
            return self.write_property(&target, &property, HostValue::from(value), sender);
        }

        let Some(var) = self.var_name(node, sender) else {
            self.report(LogLevel::Warn, "Set without `target` or `var` skipped".to_string());
            return Ok(());
        };
        let scalar = match self.attr(node, "type", sender) {
            Some(type_name) => Scalar::typed(&value, &type_name),
            None => Scalar::Str(value),
        };
        self.state.set(var, scalar);
        Ok(())
    }

    /// `SetVar var=.. value=.. [type=..]`; untyped values are inferred
    pub(super) fn exec_set_var(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let value = self.attr(node, "value", sender).unwrap_or_default();
        let scalar = match self.attr(node, "type", sender) {
            Some(type_name) => Scalar::typed(&value, &type_name),
            None => Scalar::infer(&value),
        };
        self.state.set(var, scalar);
        Ok(())
    }

    /// `Get target=.. property=.. var=..`; an absent property leaves `var` alone
    pub(super) fn exec_get(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let (Some(target), Some(var)) = (self.attr(node, "target", sender), self.var_name(node, sender))
        else {
            return Ok(());
        };
        let property = self
            .attr(node, "property", sender)
            .unwrap_or_else(|| DEFAULT_PROPERTY.to_string());

        let Some(widget) = self.lookup_widget(&target, sender) else {
            return Ok(());
        };
        if let Some(value) = self.host.get_property(&widget, &property) {
            self.state.set(var, value.to_scalar());
        }
        Ok(())
    }

    /// `Increment|Decrement|Multiply|Divide var=.. [by=1]`
    pub(super) fn exec_arithmetic(
        &mut self,
        command: Command,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let operand = self
            .attr_any(node, &["by", "value"], sender)
            .map(|by| Scalar::infer(&by))
            .unwrap_or(Scalar::Int(1));

        let op = match command {
            Command::Increment => Arithmetic::Add,
            Command::Decrement => Arithmetic::Subtract,
            Command::Multiply => Arithmetic::Multiply,
            _ => Arithmetic::Divide,
        };

        if self.state.apply(&var, op, &operand).is_none() {
            self.report(
                LogLevel::Warn,
                format!("Division of `{}` by zero ignored", var),
            );
        }
        Ok(())
    }

    /// `Calculate expression=.. var=..` stores a float
    pub(super) fn exec_calculate(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let expression = self.attr(node, "expression", sender).unwrap_or_default();
        self.state.set(var, evaluate_expression(&expression));
        Ok(())
    }

    pub(super) fn exec_toggle(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let current = self.state.get(&var).map(Scalar::is_truthy).unwrap_or(false);
        self.state.set(var, !current);
        Ok(())
    }

    pub(super) fn exec_append(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let suffix = self.attr(node, "value", sender).unwrap_or_default();
        let mut text = self.state.get(&var).map(|v| v.to_string()).unwrap_or_default();
        text.push_str(&suffix);
        self.state.set(var, text);
        Ok(())
    }

    pub(super) fn exec_clear(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        if let Some(var) = self.var_name(node, sender) {
            self.state.set(var, "");
        }
        Ok(())
    }

    /* ===================== Text ===================== */

    /// `Substring var=.. value=.. start=.. [length=..]`, char-indexed and clamped
    pub(super) fn exec_substring(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let value = self.attr(node, "value", sender).unwrap_or_default();
        let start = self.attr(node, "start", sender).map(|s| to_count(&s)).unwrap_or(0);
        let length = self.attr(node, "length", sender).map(|s| to_count(&s));

        let rest = value.chars().skip(start);
        let slice: String = match length {
            Some(n) => rest.take(n).collect(),
            None => rest.collect(),
        };
        self.state.set(var, slice);
        Ok(())
    }

    /// `Replace var=.. value=.. find=.. with=..`
    pub(super) fn exec_replace(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let value = self.attr(node, "value", sender).unwrap_or_default();
        let find = self.attr(node, "find", sender).unwrap_or_default();
        let with = self
            .attr_any(node, &["with", "replacement"], sender)
            .unwrap_or_default();

        let replaced = if find.is_empty() {
            value
        } else {
            value.replace(&find, &with)
        };
        self.state.set(var, replaced);
        Ok(())
    }

    /// `ToUpper|ToLower|Length var=.. value=..`
    pub(super) fn exec_text_transform(
        &mut self,
        command: Command,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let value = self.attr(node, "value", sender).unwrap_or_default();
        let result = match command {
            Command::ToUpper => Scalar::Str(value.to_uppercase()),
            Command::ToLower => Scalar::Str(value.to_lowercase()),
            _ => Scalar::Int(value.chars().count() as i64),
        };
        self.state.set(var, result);
        Ok(())
    }

    pub(super) fn exec_new_guid(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        if let Some(var) = self.var_name(node, sender) {
            self.state.set(var, Uuid::new_v4().to_string());
        }
        Ok(())
    }

    /// `Now var=.. [format=..]`; an invalid strftime format falls back to the default
    pub(super) fn exec_now(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let format = self
            .attr(node, "format", sender)
            .filter(|f| is_valid_format(f))
            .unwrap_or_else(|| DEFAULT_NOW_FORMAT.to_string());
        self.state.set(var, Local::now().format(&format).to_string());
        Ok(())
    }

    /// `CallFunction function=.. args=.. var=..`
    ///
    /// Built-ins first, then the host's plugin functions. No result leaves
    /// `var` untouched.
    pub(super) fn exec_call_function(
        &mut self,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(key) = self.attr_any(node, &["function", "key"], sender) else {
            return Ok(());
        };
        let args = self.attr(node, "args", sender).unwrap_or_default();

        let result = match call_builtin(&key, &args) {
            Some(value) => Some(value),
            None => self.host.resolve_plugin_function(key.trim(), &args),
        };

        match (result, self.var_name(node, sender)) {
            (Some(value), Some(var)) => self.state.set(var, Scalar::infer(&value)),
            (Some(_), None) => {}
            (None, _) => self.report(
                LogLevel::Warn,
                format!("Function `{}` is not available", key.trim()),
            ),
        }
        Ok(())
    }

    /* ===================== Host ===================== */

    /// `Show|Hide target=..` set `Visible`, `Enable|Disable target=..` set `IsEnabled`
    pub(super) fn exec_widget_flag(
        &mut self,
        command: Command,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(target) = self.attr(node, "target", sender) else {
            return Ok(());
        };
        let (property, flag) = match command {
            Command::Show => ("Visible", true),
            Command::Hide => ("Visible", false),
            Command::Enable => ("IsEnabled", true),
            _ => ("IsEnabled", false),
        };
        self.write_property(&target, property, HostValue::from(flag), sender)
    }

    /// Copy a property between widgets without interpreting the value
    pub(super) fn exec_copy_property(
        &mut self,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let (Some(from), Some(to)) = (self.attr(node, "from", sender), self.attr(node, "to", sender))
        else {
            return Ok(());
        };
        let from_property = self
            .attr(node, "fromProperty", sender)
            .unwrap_or_else(|| DEFAULT_PROPERTY.to_string());
        let to_property = self
            .attr(node, "toProperty", sender)
            .unwrap_or_else(|| from_property.clone());

        let Some(source) = self.lookup_widget(&from, sender) else {
            return Ok(());
        };
        let value = self.host.get_property(&source, &from_property);
        match value {
            Some(value) => self.write_property(&to, &to_property, value, sender),
            None => Ok(()),
        }
    }

    pub(super) fn exec_navigate(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(to) = self.attr_any(node, &["to", "target"], sender) else {
            return Ok(());
        };
        self.host
            .navigate(to.trim())
            .map_err(|e| Fault::host("navigate", e))
    }

    pub(super) fn exec_open_window(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let Some(name) = self.attr_any(node, &["name", "window"], sender) else {
            return Ok(());
        };
        self.host
            .open_window(name.trim())
            .map_err(|e| Fault::host("open_window", e))
    }

    pub(super) fn exec_close_window(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let name = self.attr_any(node, &["name", "window"], sender);
        self.host
            .close_window(name.as_deref().map(str::trim))
            .map_err(|e| Fault::host("close_window", e))
    }

    pub(super) fn exec_copy_to_clipboard(
        &mut self,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let value = self.attr(node, "value", sender).unwrap_or_default();
        self.host
            .set_clipboard(&value)
            .map_err(|e| Fault::host("set_clipboard", e))
    }

    /// Empty clipboard leaves `var` untouched
    pub(super) fn exec_paste_from_clipboard(
        &mut self,
        node: &CommandNode,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(var) = self.var_name(node, sender) else {
            return Ok(());
        };
        let text = self
            .host
            .clipboard()
            .map_err(|e| Fault::host("clipboard", e))?;
        if let Some(text) = text {
            self.state.set(var, text);
        }
        Ok(())
    }

    pub(super) fn exec_alert(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let message = self.message_text(node, sender);
        let title = self.attr(node, "title", sender).unwrap_or_default();
        self.host
            .show_alert(&title, &message)
            .map_err(|e| Fault::host("show_alert", e))
    }

    /// `Log message=.. [level=info]`, or the element's text as the message
    pub(super) fn exec_log(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let message = self.message_text(node, sender);
        let level = self
            .attr(node, "level", sender)
            .map(|l| LogLevel::parse(&l))
            .unwrap_or(LogLevel::Info);
        self.host.log(level, &message);
        Ok(())
    }

    pub(super) fn exec_throw(&mut self, node: &CommandNode, sender: Option<&WidgetRef>) -> ExecResult {
        let message = self.message_text(node, sender);
        let message = if message.is_empty() {
            "Error".to_string()
        } else {
            message
        };
        Err(Fault::Raised(message))
    }

    /* ===================== Helpers ===================== */

    fn write_property(
        &mut self,
        target: &str,
        property: &str,
        value: HostValue,
        sender: Option<&WidgetRef>,
    ) -> ExecResult {
        let Some(widget) = self.lookup_widget(target, sender) else {
            return Ok(());
        };
        self.host
            .set_property(&widget, property.trim(), value)
            .map_err(|e| Fault::host("set_property", e))
    }

    /// `message` attribute, else the element's inline text
    fn message_text(&self, node: &CommandNode, sender: Option<&WidgetRef>) -> String {
        match node.attr("message").or_else(|| node.text_content()) {
            Some(raw) => self.resolver(sender).resolve(raw).into_owned(),
            None => String::new(),
        }
    }
}

/// Non-negative integer from attribute text; fractions truncate
fn to_count(text: &str) -> usize {
    let n = coerce_f64(text);
    if n.is_finite() && n > 0.0 {
        n.trunc() as usize
    } else {
        0
    }
}

fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
