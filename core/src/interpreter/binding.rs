//! `{name}` / `{widget.property}` interpolation
//!
//! Tokens are resolved in a single left-to-right pass. Resolved values are
//! never rescanned, so a value that itself contains braces is inserted as-is.
//!
//! A token whose inner text contains a quote, bracket, colon, comma or newline
//! is not a variable reference. It is left alone so JSON-like payloads keep
//! their braces. Unresolvable tokens are preserved literally.

use std::borrow::Cow;

use crate::host::{find_widget, HostBridge, WidgetRef};
use crate::state::StateStore;

pub struct BindingResolver<'a> {
    state: &'a StateStore,
    host: &'a dyn HostBridge,
    sender: Option<&'a WidgetRef>,
}

impl<'a> BindingResolver<'a> {
    pub fn new(state: &'a StateStore, host: &'a dyn HostBridge, sender: Option<&'a WidgetRef>) -> Self {
        Self {
            state,
            host,
            sender,
        }
    }

    /// Substitute every resolvable token in `text`
    pub fn resolve<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !text.contains('{') {
            return Cow::Borrowed(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(['{', '}']) {
                Some(pos) if after[pos..].starts_with('}') => {
                    let inner = &after[..pos];
                    match self.lookup(inner) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('{');
                            out.push_str(inner);
                            out.push('}');
                        }
                    }
                    rest = &after[pos + 1..];
                }
                Some(pos) => {
                    // Another `{` opens first; only the innermost pair can be a token
                    out.push('{');
                    out.push_str(&after[..pos]);
                    rest = &after[pos..];
                }
                None => {
                    out.push('{');
                    out.push_str(after);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        Cow::Owned(out)
    }

    /// Resolve the inside of one `{...}` token
    ///
    /// `widget.property` (exactly one dot) asks the host first and falls back
    /// to a variable with the full dotted name.
    pub fn lookup(&self, inner: &str) -> Option<String> {
        if !is_simple_reference(inner) {
            return None;
        }
        let name = inner.trim();
        if name.is_empty() {
            return None;
        }

        if name.matches('.').count() == 1 {
            if let Some((widget, property)) = name.split_once('.') {
                let value = find_widget(self.host, widget, self.sender)
                    .and_then(|w| self.host.get_property(&w, property.trim()));
                if let Some(value) = value {
                    return Some(value.to_string());
                }
            }
        }

        self.state.get(name).map(|v| v.to_string())
    }
}

fn is_simple_reference(inner: &str) -> bool {
    !inner
        .chars()
        .any(|c| matches!(c, '"' | '\'' | '[' | ']' | ':' | ',' | '\n' | '\r'))
}

/// True if `text` is exactly one `{...}` token shaped like a variable reference
pub fn is_bare_token(text: &str) -> bool {
    let t = text.trim();
    t.len() >= 2
        && t.starts_with('{')
        && t.ends_with('}')
        && !t[1..t.len() - 1].contains(['{', '}'])
        && is_simple_reference(&t[1..t.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::types::Scalar;

    fn resolve_with(state: &StateStore, host: &MemoryHost, text: &str) -> String {
        BindingResolver::new(state, host, None).resolve(text).into_owned()
    }

    #[test]
    fn test_no_braces_is_identity() {
        let state = StateStore::new();
        let host = MemoryHost::new();
        let resolver = BindingResolver::new(&state, &host, None);
        let out = resolver.resolve("no braces here");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "no braces here");
    }

    #[test]
    fn test_variable_substitution() {
        let mut state = StateStore::new();
        let host = MemoryHost::new();
        assert_eq!(resolve_with(&state, &host, "{x}"), "{x}");

        state.set("x", 5_i64);
        assert_eq!(resolve_with(&state, &host, "{x}"), "5");
        assert_eq!(resolve_with(&state, &host, "x={x}, again {x}!"), "x=5, again 5!");
    }

    #[test]
    fn test_widget_property_lookup() {
        let mut state = StateStore::new();
        let host = MemoryHost::new().with_property("name", "Text", "Ada");
        assert_eq!(resolve_with(&state, &host, "Hi {name.Text}"), "Hi Ada");

        // Unknown property falls back to a dotted variable name
        state.set("name.Missing", "var");
        assert_eq!(resolve_with(&state, &host, "{name.Missing}"), "var");
        assert_eq!(resolve_with(&state, &host, "{name.Other}"), "{name.Other}");
    }

    #[test]
    fn test_sender_property() {
        let state = StateStore::new();
        let host = MemoryHost::new().with_property("btn1", "Tag", "7");
        let sender = WidgetRef::new("btn1");
        let resolver = BindingResolver::new(&state, &host, Some(&sender));
        assert_eq!(resolver.resolve("row {$sender.Tag}"), "row 7");
    }

    #[test]
    fn test_json_payload_untouched() {
        let mut state = StateStore::new();
        state.set("id", 3_i64);
        let host = MemoryHost::new();
        let payload = r#"{"id": {id}, "tags": ["a", "b"]}"#;
        assert_eq!(
            resolve_with(&state, &host, payload),
            r#"{"id": 3, "tags": ["a", "b"]}"#
        );
        assert_eq!(resolve_with(&state, &host, r#"{"k":1}"#), r#"{"k":1}"#);
        assert_eq!(resolve_with(&state, &host, "{a,b}"), "{a,b}");
    }

    #[test]
    fn test_resolved_values_are_not_rescanned() {
        let mut state = StateStore::new();
        state.set("outer", "{inner}");
        state.set("inner", "deep");
        let host = MemoryHost::new();
        assert_eq!(resolve_with(&state, &host, "{outer}"), "{inner}");
    }

    #[test]
    fn test_unbalanced_braces() {
        let mut state = StateStore::new();
        state.set("x", Scalar::Float(1.5));
        let host = MemoryHost::new();
        assert_eq!(resolve_with(&state, &host, "{x"), "{x");
        assert_eq!(resolve_with(&state, &host, "x}"), "x}");
        assert_eq!(resolve_with(&state, &host, "{{x}}"), "{1.5}");
        assert_eq!(resolve_with(&state, &host, "{}"), "{}");
    }

    #[test]
    fn test_is_bare_token() {
        assert!(is_bare_token(" {flag} "));
        assert!(!is_bare_token("{a} == 1"));
        assert!(!is_bare_token(r#"{"k":1}"#));
    }
}
