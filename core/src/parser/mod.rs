//! Document parser - PEST-based reader for the markup format
//!
//! Produces the `CommandNode` tree the interpreter walks. Supports:
//! - elements with single- or double-quoted attributes
//! - self-closing tags
//! - text content and CDATA sections (concatenated, trimmed)
//! - comments and an optional `<?...?>` prolog
//! - the five predefined entities plus numeric character references
//!
//! JSON documents (the serde form of `CommandNode`) are also accepted.

use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

use crate::types::CommandNode;


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/markup.pest"]
struct MarkupParser;

/* ===================== Error Types ===================== */

/// Source location, 0-indexed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg, _) => write!(f, "{}", msg),
            ParseError::BuildError(msg, Some(span)) => {
                write!(f, "{} (line {}, column {})", msg, span.line + 1, span.col + 1)
            }
            ParseError::BuildError(msg, None) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, col) = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        let span = Span {
            start: 0,
            end: 0,
            line: line.saturating_sub(1),
            col: col.saturating_sub(1),
        };
        ParseError::PestError(err.to_string(), Some(span))
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        let span = (err.line() > 0).then(|| Span {
            start: 0,
            end: 0,
            line: err.line() - 1,
            col: err.column().saturating_sub(1),
        });
        ParseError::BuildError(format!("Invalid JSON document: {}", err), span)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

fn pair_to_span(pair: &pest::iterators::Pair<Rule>) -> Span {
    let span = pair.as_span();
    let (line, col) = span.start_pos().line_col();
    Span {
        start: span.start(),
        end: span.end(),
        line: line.saturating_sub(1),
        col: col.saturating_sub(1),
    }
}

/* ===================== Public API ===================== */

/// Parse markup source into its root command node
pub fn parse_markup(source: &str) -> ParseResult<CommandNode> {
    let document = MarkupParser::parse(Rule::document, source)?
        .next()
        .ok_or_else(|| ParseError::BuildError("Empty document".to_string(), None))?;

    let root = document
        .into_inner()
        .find(|p| p.as_rule() == Rule::element)
        .ok_or_else(|| ParseError::BuildError("Document has no root element".to_string(), None))?;

    build_element(root)
}

/// Parse the JSON form of a command tree
pub fn parse_json(source: &str) -> ParseResult<CommandNode> {
    Ok(serde_json::from_str(source)?)
}

/// Parse either format; JSON is recognised by a leading `{`
pub fn parse_document(source: &str) -> ParseResult<CommandNode> {
    if source.trim_start().starts_with('{') {
        parse_json(source)
    } else {
        parse_markup(source)
    }
}

/* ===================== Tree Builder ===================== */

fn build_element(pair: pest::iterators::Pair<Rule>) -> ParseResult<CommandNode> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let tag = inner
        .next()
        .filter(|p| p.as_rule() == Rule::name)
        .ok_or_else(|| ParseError::BuildError("Element without a name".to_string(), Some(span)))?
        .as_str();

    let mut node = CommandNode::new(tag);
    let mut text = String::new();

    for part in inner {
        match part.as_rule() {
            Rule::attribute => {
                let attr_span = pair_to_span(&part);
                let (name, value) = build_attribute(part)?;
                if node.attributes.contains_key(&name) {
                    return Err(ParseError::BuildError(
                        format!("Duplicate attribute `{}` on <{}>", name, tag),
                        Some(attr_span),
                    ));
                }
                node.attributes.insert(name, value);
            }
            Rule::element => node.children.push(build_element(part)?),
            Rule::text => text.push_str(&decode_entities(part.as_str())),
            Rule::cdata => {
                if let Some(body) = part.into_inner().next() {
                    text.push_str(body.as_str());
                }
            }
            Rule::closing_tag => {
                let close_span = pair_to_span(&part);
                let closing = part.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                if closing != tag {
                    return Err(ParseError::BuildError(
                        format!("Mismatched closing tag: expected </{}>, found </{}>", tag, closing),
                        Some(close_span),
                    ));
                }
            }
            _ => {}
        }
    }

    let text = text.trim();
    if !text.is_empty() {
        node.text = Some(text.to_string());
    }
    Ok(node)
}

fn build_attribute(pair: pest::iterators::Pair<Rule>) -> ParseResult<(String, String)> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str().to_string());
    let value = inner.next().map(|p| decode_entities(p.as_str()));

    match (name, value) {
        (Some(name), Some(value)) => Ok((name, value)),
        _ => Err(ParseError::BuildError(
            "Malformed attribute".to_string(),
            Some(span),
        )),
    }
}

/// Decode `&amp; &lt; &gt; &quot; &apos;` and `&#N;` / `&#xH;`
///
/// Unrecognised references are kept as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];

        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[1..semi];
            decode_entity(entity).map(|ch| (ch, semi + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}
