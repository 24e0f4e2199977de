//! Boolean condition evaluation
//!
//! Pipeline:
//! 1. resolve `{...}` bindings
//! 2. normalize escaped and word operators to symbols
//!    (`AND`→`&&`, `OR`→`||`, `EQUALS`→`==`, `NOT`→`!=`, `eq ne gt lt gte lte`)
//! 3. `&&` present: split on every occurrence, all parts must hold
//! 4. else `||` present: split, any part must hold
//! 5. else a leading `!` negates the rest
//! 6. else a single comparison, or bare truthiness when no operator is present
//!
//! Both sides of `&&`/`||` are always evaluated. Operands are pure reads so
//! this is not observable.

use super::binding::{is_bare_token, BindingResolver};
use crate::types::{coerce_f64, text_is_truthy};

/// Resolve bindings in `text` and evaluate it as a condition
pub fn evaluate_condition(text: &str, resolver: &BindingResolver<'_>) -> bool {
    let resolved = resolver.resolve(text);
    evaluate_resolved(&resolved)
}

/// Evaluate condition text that has already been through binding resolution
pub fn evaluate_resolved(text: &str) -> bool {
    let normalized = normalize_operators(text);
    eval_normalized(&normalized)
}

fn eval_normalized(text: &str) -> bool {
    if text.contains("&&") {
        let parts: Vec<bool> = text.split("&&").map(eval_normalized).collect();
        return parts.into_iter().all(|p| p);
    }

    if text.contains("||") {
        let parts: Vec<bool> = text.split("||").map(eval_normalized).collect();
        return parts.into_iter().any(|p| p);
    }

    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix('!') {
        if !rest.starts_with('=') {
            return !eval_normalized(rest);
        }
    }

    compare(trimmed)
}

/* ===================== Comparison ===================== */

fn compare(text: &str) -> bool {
    if let Some((left, right)) = text.split_once("==") {
        return unquote(left) == unquote(right);
    }
    if let Some((left, right)) = text.split_once("!=") {
        return unquote(left) != unquote(right);
    }

    // Two-character operators first so `>=` is never read as `>`
    for op in [">=", "<=", ">", "<"] {
        if let Some((left, right)) = text.split_once(op) {
            let l = coerce_f64(unquote(left));
            let r = coerce_f64(unquote(right));
            return match op {
                ">=" => l >= r,
                "<=" => l <= r,
                ">" => l > r,
                _ => l < r,
            };
        }
    }

    // An unresolved `{flag}` is an absent variable, and absent is falsy
    if is_bare_token(text) {
        return false;
    }
    text_is_truthy(unquote(text))
}

fn unquote(text: &str) -> &str {
    let t = text.trim();
    for q in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return &t[1..t.len() - 1];
        }
    }
    t
}

/* ===================== Normalization ===================== */

/// Rewrite markup escapes and word operators into symbolic operators
///
/// Only whole, unquoted, whitespace-delimited words are rewritten.
pub fn normalize_operators(text: &str) -> String {
    let unescaped = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"");

    let mut out = String::with_capacity(unescaped.len());
    let mut word = String::new();
    let mut word_quoted = false;
    let mut quote: Option<char> = None;

    for ch in unescaped.chars() {
        if ch.is_whitespace() && quote.is_none() {
            flush_word(&mut out, &mut word, word_quoted);
            word_quoted = false;
            out.push(ch);
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                word_quoted = true;
            }
            _ => {}
        }
        word.push(ch);
    }
    flush_word(&mut out, &mut word, word_quoted);
    out
}

fn flush_word(out: &mut String, word: &mut String, quoted: bool) {
    let symbol = if quoted { None } else { word_operator(word) };
    out.push_str(symbol.unwrap_or(word.as_str()));
    word.clear();
}

fn word_operator(word: &str) -> Option<&'static str> {
    let op = match word.to_ascii_lowercase().as_str() {
        "and" => "&&",
        "or" => "||",
        "equals" | "eq" => "==",
        "not" | "ne" => "!=",
        "gte" => ">=",
        "lte" => "<=",
        "gt" => ">",
        "lt" => "<",
        _ => return None,
    };
    Some(op)
}
