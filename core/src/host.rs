//! The seam between the interpreter and the surrounding UI host
//!
//! The interpreter never owns widgets. It asks the host to find a widget by
//! name and to get/set a property by string key. Everything visual (layout,
//! rendering, windows) lives behind `HostBridge`.
//!
//! `MemoryHost` is a complete in-memory host used by the CLI and the tests.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::types::{CommandNode, Scalar};

/// Widget name that always refers to the widget which raised the current event
pub const SENDER_ALIAS: &str = "$sender";

/* ===================== Host Types ===================== */

/// Opaque handle to a host-owned widget
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetRef(String);

impl WidgetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A widget property value
///
/// Structured values (image handles, arbitrary objects) are carried as
/// `Opaque` and passed between widgets without interpretation.
#[derive(Clone)]
pub enum HostValue {
    Scalar(Scalar),
    Opaque { label: String, handle: Rc<dyn Any> },
}

impl HostValue {
    pub fn opaque(label: impl Into<String>, handle: Rc<dyn Any>) -> Self {
        HostValue::Opaque {
            label: label.into(),
            handle,
        }
    }

    /// Scalar view; opaque values collapse to their label text
    pub fn to_scalar(&self) -> Scalar {
        match self {
            HostValue::Scalar(s) => s.clone(),
            HostValue::Opaque { label, .. } => Scalar::Str(label.clone()),
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Scalar(s) => write!(f, "{}", s),
            HostValue::Opaque { label, .. } => f.write_str(label),
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            HostValue::Opaque { label, .. } => f.debug_tuple("Opaque").field(label).finish(),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Scalar(a), HostValue::Scalar(b)) => a == b,
            (HostValue::Opaque { handle: a, .. }, HostValue::Opaque { handle: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl From<Scalar> for HostValue {
    fn from(v: Scalar) -> Self {
        HostValue::Scalar(v)
    }
}

macro_rules! host_value_from {
    ($($t:ty),*) => {
        $(impl From<$t> for HostValue {
            fn from(v: $t) -> Self {
                HostValue::Scalar(Scalar::from(v))
            }
        })*
    };
}

host_value_from!(bool, i64, f64, &str, String);

/// Severity for the host diagnostic sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lenient parse for markup attributes; unknown text is `Info`
    pub fn parse(text: &str) -> LogLevel {
        match text.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" | "verbose" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" | "fatal" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// An event raised by the host while a handler is running (timer tick, input)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub handler: String,
    pub sender: Option<WidgetRef>,
}

/* ===================== HostBridge ===================== */

/// Operations the interpreter consumes from the UI host
///
/// Only widget lookup and property access are mandatory. Navigation, window,
/// alert and clipboard primitives default to an error, which a `TryCatch` can
/// recover from. Plugin resolution defaults to "not handled".
pub trait HostBridge {
    fn widget(&self, name: &str) -> Option<WidgetRef>;

    fn get_property(&self, widget: &WidgetRef, property: &str) -> Option<HostValue>;

    fn set_property(&mut self, widget: &WidgetRef, property: &str, value: HostValue) -> Result<()>;

    /// Evaluate a function the interpreter does not know natively
    fn resolve_plugin_function(&mut self, _key: &str, _args: &str) -> Option<String> {
        None
    }

    /// Execute a command tag the interpreter does not know natively
    ///
    /// Returns `Ok(false)` when the host does not handle the tag either.
    fn resolve_plugin_command(
        &mut self,
        _node: &CommandNode,
        _sender: Option<&WidgetRef>,
    ) -> Result<bool> {
        Ok(false)
    }

    fn navigate(&mut self, target: &str) -> Result<()> {
        bail!("navigation to `{}` is not supported by this host", target)
    }

    fn open_window(&mut self, name: &str) -> Result<()> {
        bail!("opening window `{}` is not supported by this host", name)
    }

    fn close_window(&mut self, _name: Option<&str>) -> Result<()> {
        bail!("closing windows is not supported by this host")
    }

    fn show_alert(&mut self, _title: &str, _message: &str) -> Result<()> {
        bail!("alerts are not supported by this host")
    }

    fn set_clipboard(&mut self, _text: &str) -> Result<()> {
        bail!("clipboard is not supported by this host")
    }

    fn clipboard(&mut self) -> Result<Option<String>> {
        bail!("clipboard is not supported by this host")
    }

    /// Drain events the host raised since the last pump
    ///
    /// Called while a `Delay` command waits; each event's handler runs
    /// re-entrantly before the delay returns.
    fn pump_events(&mut self) -> Vec<HostEvent> {
        Vec::new()
    }

    /// Append-only diagnostic sink
    fn log(&mut self, level: LogLevel, message: &str) {
        emit_tracing(level, message);
    }
}

/// Forward a diagnostic line to `tracing` at the matching level
pub fn emit_tracing(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: "cue::host", "{}", message),
        LogLevel::Info => tracing::info!(target: "cue::host", "{}", message),
        LogLevel::Warn => tracing::warn!(target: "cue::host", "{}", message),
        LogLevel::Error => tracing::error!(target: "cue::host", "{}", message),
    }
}

/// Look a widget up by name, honouring the `$sender` alias
pub fn find_widget(
    host: &dyn HostBridge,
    name: &str,
    sender: Option<&WidgetRef>,
) -> Option<WidgetRef> {
    let name = name.trim();
    if name.eq_ignore_ascii_case(SENDER_ALIAS) {
        return sender.cloned();
    }
    host.widget(name)
}

/* ===================== MemoryHost ===================== */

type PluginFunction = Box<dyn Fn(&str) -> String>;

/// In-memory host: widgets are property maps, side effects are recorded
#[derive(Default)]
pub struct MemoryHost {
    widgets: HashMap<String, HashMap<String, HostValue>>,
    /// Create widgets on first lookup instead of reporting them missing
    permissive: bool,
    clipboard: Option<String>,
    pending: VecDeque<HostEvent>,
    failures: HashMap<String, String>,
    plugin_functions: HashMap<String, PluginFunction>,
    plugin_commands: HashSet<String>,

    pub alerts: Vec<(String, String)>,
    pub navigations: Vec<String>,
    pub open_windows: Vec<String>,
    pub plugin_calls: Vec<String>,
    pub logs: Vec<(LogLevel, String)>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host where any widget name resolves (widgets spring into existence)
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub fn with_widget(mut self, name: impl Into<String>) -> Self {
        self.widgets.entry(name.into()).or_default();
        self
    }

    pub fn with_property(
        mut self,
        widget: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<HostValue>,
    ) -> Self {
        self.widgets
            .entry(widget.into())
            .or_default()
            .insert(property.into(), value.into());
        self
    }

    pub fn with_plugin_function(
        mut self,
        key: impl Into<String>,
        function: impl Fn(&str) -> String + 'static,
    ) -> Self {
        self.plugin_functions.insert(key.into(), Box::new(function));
        self
    }

    pub fn with_plugin_command(mut self, tag: impl Into<String>) -> Self {
        self.plugin_commands.insert(tag.into());
        self
    }

    /// Make `operation` (a method name such as `set_property`, or a plugin
    /// command tag) fail with `message`
    pub fn fail_on(mut self, operation: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(operation.into(), message.into());
        self
    }

    pub fn queue_event(&mut self, handler: impl Into<String>, sender: Option<WidgetRef>) {
        self.pending.push_back(HostEvent {
            handler: handler.into(),
            sender,
        });
    }

    pub fn property(&self, widget: &str, property: &str) -> Option<&HostValue> {
        self.widgets.get(widget)?.get(property)
    }

    pub fn property_text(&self, widget: &str, property: &str) -> Option<String> {
        self.property(widget, property).map(|v| v.to_string())
    }

    pub fn clipboard_text(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Text view of every widget property, ordered for display
    pub fn widget_snapshot(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.widgets
            .iter()
            .map(|(name, props)| {
                let props = props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_string()))
                    .collect();
                (name.clone(), props)
            })
            .collect()
    }

    fn check(&self, operation: &str) -> Result<()> {
        match self.failures.get(operation) {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

impl HostBridge for MemoryHost {
    fn widget(&self, name: &str) -> Option<WidgetRef> {
        if self.permissive || self.widgets.contains_key(name) {
            return Some(WidgetRef::new(name));
        }
        None
    }

    fn get_property(&self, widget: &WidgetRef, property: &str) -> Option<HostValue> {
        self.property(widget.id(), property).cloned()
    }

    fn set_property(&mut self, widget: &WidgetRef, property: &str, value: HostValue) -> Result<()> {
        self.check("set_property")?;
        self.widgets
            .entry(widget.id().to_string())
            .or_default()
            .insert(property.to_string(), value);
        Ok(())
    }

    fn resolve_plugin_function(&mut self, key: &str, args: &str) -> Option<String> {
        self.plugin_functions.get(key).map(|f| f(args))
    }

    fn resolve_plugin_command(
        &mut self,
        node: &CommandNode,
        _sender: Option<&WidgetRef>,
    ) -> Result<bool> {
        if !self.plugin_commands.contains(&node.tag) {
            return Ok(false);
        }
        self.check(&node.tag)?;
        self.plugin_calls.push(node.tag.clone());
        Ok(true)
    }

    fn navigate(&mut self, target: &str) -> Result<()> {
        self.check("navigate")?;
        self.navigations.push(target.to_string());
        Ok(())
    }

    fn open_window(&mut self, name: &str) -> Result<()> {
        self.check("open_window")?;
        self.open_windows.push(name.to_string());
        Ok(())
    }

    fn close_window(&mut self, name: Option<&str>) -> Result<()> {
        self.check("close_window")?;
        match name {
            Some(name) => self.open_windows.retain(|w| w != name),
            None => {
                self.open_windows.pop();
            }
        }
        Ok(())
    }

    fn show_alert(&mut self, title: &str, message: &str) -> Result<()> {
        self.check("show_alert")?;
        self.alerts.push((title.to_string(), message.to_string()));
        Ok(())
    }

    fn set_clipboard(&mut self, text: &str) -> Result<()> {
        self.check("set_clipboard")?;
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn clipboard(&mut self) -> Result<Option<String>> {
        self.check("clipboard")?;
        Ok(self.clipboard.clone())
    }

    fn pump_events(&mut self) -> Vec<HostEvent> {
        self.pending.drain(..).collect()
    }

    fn log(&mut self, level: LogLevel, message: &str) {
        emit_tracing(level, message);
        self.logs.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_alias() {
        let host = MemoryHost::new().with_widget("btn");
        let sender = WidgetRef::new("btn");
        assert_eq!(find_widget(&host, "$sender", Some(&sender)), Some(sender.clone()));
        assert_eq!(find_widget(&host, "$sender", None), None);
        assert_eq!(find_widget(&host, "btn", None), Some(sender));
        assert_eq!(find_widget(&host, "missing", None), None);
    }

    #[test]
    fn test_permissive_host_creates_widgets() {
        let mut host = MemoryHost::permissive();
        let lbl = host.widget("lbl").expect("permissive lookup");
        host.set_property(&lbl, "Text", "hi".into()).unwrap();
        assert_eq!(host.property_text("lbl", "Text"), Some("hi".to_string()));
    }

    #[test]
    fn test_injected_failure() {
        let mut host = MemoryHost::new().fail_on("navigate", "no route");
        let err = host.navigate("Home").unwrap_err();
        assert_eq!(err.to_string(), "no route");
        assert!(host.navigations.is_empty());
    }

    #[test]
    fn test_opaque_values_compare_by_identity() {
        let handle: Rc<dyn Any> = Rc::new(vec![1u8, 2, 3]);
        let a = HostValue::opaque("image", handle.clone());
        let b = HostValue::opaque("image", handle);
        let c = HostValue::opaque("image", Rc::new(0u8));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "image");
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("Warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::parse("chatty"), LogLevel::Info);
    }
}
