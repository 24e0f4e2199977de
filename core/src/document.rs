//! Loaded documents: declared variables and handlers extracted from a tree
//!
//! Declarations may appear anywhere in the tree except inside a handler
//! body, where the children are commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::handlers::Handler;
use crate::parser;
use crate::types::{CommandNode, Scalar};

/// `<Variable name=".." value=".." [type=".."]/>` (also `<Var>`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub value: Scalar,
}

impl VariableDecl {
    /// Untyped values are inferred (`0` is an int, `true` a bool)
    pub fn from_node(node: &CommandNode) -> Option<VariableDecl> {
        let name = node.attr("name")?.trim();
        if name.is_empty() {
            return None;
        }
        let raw = node.attr("value").or(node.text_content()).unwrap_or_default();
        let value = match node.attr("type") {
            Some(type_name) => Scalar::typed(raw, type_name),
            None => Scalar::infer(raw),
        };
        Some(VariableDecl {
            name: name.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub variables: Vec<VariableDecl>,
    pub handlers: Vec<Handler>,
    /// SHA-256 of the source text, when loaded from text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_hash: Option<String>,
}

impl Document {
    /// Extract declarations from a parsed tree, in document order
    pub fn from_root(root: &CommandNode) -> Document {
        let mut document = Document {
            variables: Vec::new(),
            handlers: Vec::new(),
            version_hash: None,
        };
        document.collect(root);
        document
    }

    /// Parse markup or JSON source and record its version hash
    pub fn parse(source: &str) -> Result<Document> {
        let root = parser::parse_document(source).context("Failed to parse document")?;
        let mut document = Document::from_root(&root);
        document.version_hash = Some(hash_source(source));
        Ok(document)
    }

    fn collect(&mut self, node: &CommandNode) {
        if node.is("Variable") || node.is("Var") {
            match VariableDecl::from_node(node) {
                Some(decl) => self.variables.push(decl),
                None => warn!("Variable declaration without a name ignored"),
            }
            return;
        }

        if node.is("Handler") {
            match Handler::from_node(node) {
                Some(handler) => self.handlers.push(handler),
                None => warn!("Handler declaration without a name ignored"),
            }
            return;
        }

        for child in &node.children {
            self.collect(child);
        }
    }
}

/// Hash document source using SHA256
pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
