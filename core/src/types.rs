//! Core data types shared by the evaluators, the dispatcher and the host seam

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/* ===================== Scalar ===================== */

/// Dynamically-typed value stored in the StateStore
///
/// Coercion rules are total:
/// - numeric: Int/Float as-is, Bool → 1/0, Str → parsed (trimmed) or 0
/// - boolean: see `is_truthy`
/// - text: see the `Display` impl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Infer the most specific scalar for declaration text
    ///
    /// `true`/`false` (any case) become Bool, integral text becomes Int,
    /// decimal text becomes Float, everything else stays a string.
    pub fn infer(text: &str) -> Scalar {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Scalar::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Scalar::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Scalar::Int(i);
        }
        if looks_numeric(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Scalar::Float(f);
            }
        }
        Scalar::Str(text.to_string())
    }

    /// Build a scalar for an explicit declared type name
    ///
    /// Unknown type names fall back to `infer`.
    pub fn typed(text: &str, type_name: &str) -> Scalar {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "long" => Scalar::Int(
                text.trim()
                    .parse::<i64>()
                    .unwrap_or_else(|_| coerce_f64(text).trunc() as i64),
            ),
            "float" | "double" | "number" | "decimal" => Scalar::Float(coerce_f64(text)),
            "bool" | "boolean" => Scalar::Bool(text_is_truthy(text)),
            "string" | "text" => Scalar::Str(text.to_string()),
            _ => Scalar::infer(text),
        }
    }

    /// Numeric coercion (absent/non-numeric text is 0)
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Int(i) => *i as f64,
            Scalar::Float(f) => *f,
            Scalar::Str(s) => coerce_f64(s),
        }
    }

    /// Boolean coercion: empty, `0` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::Str(s) => text_is_truthy(s),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            // f64's Display never uses exponent notation and drops a zero fraction,
            // so 3.0 renders as "3"
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// Parse text as a float, defaulting to 0 on failure
pub fn coerce_f64(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(0.0)
}

/// Lexical truthiness used for raw text (conditions, `bool` declarations)
pub fn text_is_truthy(text: &str) -> bool {
    let t = text.trim();
    !(t.is_empty() || t == "0" || t.eq_ignore_ascii_case("false"))
}

fn looks_numeric(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/* ===================== Command Node ===================== */

/// One node of a parsed behavior tree
///
/// Produced by the document parser (markup or JSON) and only ever read by
/// the interpreter. Attribute and tag lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommandNode>,
}

impl CommandNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: CommandNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = CommandNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// True if this node's tag matches `tag` (ASCII case-insensitive)
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Raw attribute value (ASCII case-insensitive name match)
    pub fn attr(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.attributes.get(name) {
            return Some(v.as_str());
        }
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First attribute present among `names`
    pub fn attr_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| self.attr(n))
    }

    /// First child with the given tag
    pub fn child(&self, tag: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.is(tag))
    }

    /// All children with the given tag, in document order
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a CommandNode> + 'a {
        self.children.iter().filter(move |c| c.is(tag))
    }

    /// Children whose tag is none of `excluded`
    pub fn children_except<'a>(
        &'a self,
        excluded: &'a [&'a str],
    ) -> impl Iterator<Item = &'a CommandNode> + 'a {
        self.children
            .iter()
            .filter(move |c| !excluded.iter().any(|t| c.is(t)))
    }

    /// Inline text, trimmed; `None` when absent or blank
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_scalar_kinds() {
        assert_eq!(Scalar::infer("0"), Scalar::Int(0));
        assert_eq!(Scalar::infer("-12"), Scalar::Int(-12));
        assert_eq!(Scalar::infer("2.5"), Scalar::Float(2.5));
        assert_eq!(Scalar::infer("TRUE"), Scalar::Bool(true));
        assert_eq!(Scalar::infer("hello"), Scalar::Str("hello".to_string()));
        // "inf" parses as f64 but is not numeric text
        assert_eq!(Scalar::infer("inf"), Scalar::Str("inf".to_string()));
    }

    #[test]
    fn test_typed_declarations() {
        assert_eq!(Scalar::typed("7", "double"), Scalar::Float(7.0));
        assert_eq!(Scalar::typed("7.9", "int"), Scalar::Int(7));
        assert_eq!(Scalar::typed("0", "bool"), Scalar::Bool(false));
        assert_eq!(Scalar::typed("42", "string"), Scalar::Str("42".to_string()));
        assert_eq!(Scalar::typed("42", "whatever"), Scalar::Int(42));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Scalar::Str(" 4.5 ".to_string()).as_f64(), 4.5);
        assert_eq!(Scalar::Str("abc".to_string()).as_f64(), 0.0);
        assert_eq!(Scalar::Bool(true).as_f64(), 1.0);
        assert_eq!(Scalar::Int(3).as_f64(), 3.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Scalar::Str(String::new()).is_truthy());
        assert!(!Scalar::Str("0".to_string()).is_truthy());
        assert!(!Scalar::Str("False".to_string()).is_truthy());
        assert!(Scalar::Str("no".to_string()).is_truthy());
        assert!(!Scalar::Float(0.0).is_truthy());
        assert!(Scalar::Int(-1).is_truthy());
    }

    #[test]
    fn test_display_drops_zero_fraction() {
        assert_eq!(Scalar::Float(3.0).to_string(), "3");
        assert_eq!(Scalar::Float(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let node = CommandNode::new("Set").with_attr("Target", "lbl");
        assert_eq!(node.attr("target"), Some("lbl"));
        assert_eq!(node.attr("TARGET"), Some("lbl"));
        assert_eq!(node.attr("value"), None);
        assert!(node.is("set"));
    }

    #[test]
    fn test_children_except() {
        let node = CommandNode::new("If")
            .with_child(CommandNode::new("Log"))
            .with_child(CommandNode::new("Else"))
            .with_child(CommandNode::new("Alert"));
        let tags: Vec<_> = node
            .children_except(&["Else"])
            .map(|c| c.tag.as_str())
            .collect();
        assert_eq!(tags, vec!["Log", "Alert"]);
    }
}
