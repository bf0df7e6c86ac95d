//! Grammar definitions and the structural query engine
//!
//! Each supported language is backed by a tree-sitter grammar. Source text is
//! parsed into a [`ParsedSource`] and queried with a [`SyntaxQuery`], which
//! returns a [`CaptureSet`] of exact source spans per capture label.
//!
//! # Supported Languages
//!
//! - C++ (fragment-only language)
//! - Python (execution language)

mod cpp;
mod python;
mod query;

pub use cpp::CppGrammar;
pub use python::PythonGrammar;
pub use query::{Capture, CaptureSet, SyntaxQuery};

use std::sync::Mutex;

use crate::{Error, Language, Result};

/// Trait for language grammar definitions
pub trait Grammar: Send + Sync + std::fmt::Debug {
    /// Get the language this grammar defines
    fn language(&self) -> Language;

    /// The tree-sitter language used to compile queries
    fn ts_language(&self) -> tree_sitter::Language;

    /// Parse source text into a syntax tree
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the parser produced no tree
    fn parse(&self, code: &str) -> Result<ParsedSource>;

    /// Node kinds that carry plain identifiers in this grammar
    fn identifier_kinds(&self) -> &'static [&'static str] {
        &["identifier"]
    }

    /// Validate that a code string parses without error nodes
    fn validate(&self, code: &str) -> bool {
        if code.trim().is_empty() {
            return false;
        }
        self.parse(code).is_ok_and(|parsed| !parsed.has_errors())
    }
}

/// Create a grammar for the specified language
///
/// # Errors
///
/// Returns [`Error::Grammar`] if the tree-sitter grammar cannot be loaded
pub fn grammar_for(language: Language) -> Result<Box<dyn Grammar>> {
    Ok(match language {
        Language::Cpp => Box::new(CppGrammar::new()?),
        Language::Python => Box::new(PythonGrammar::new()?),
    })
}

/// Source text together with its syntax tree
#[derive(Debug, Clone)]
pub struct ParsedSource {
    source: String,
    tree: tree_sitter::Tree,
}

impl ParsedSource {
    /// Pair source text with the tree parsed from it
    #[must_use]
    pub fn new(source: impl Into<String>, tree: tree_sitter::Tree) -> Self {
        Self {
            source: source.into(),
            tree,
        }
    }

    /// Source text the tree was parsed from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node of the syntax tree
    #[must_use]
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Exact source text spanned by a node
    #[must_use]
    pub fn text(&self, node: tree_sitter::Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// Whether the tree contains error or missing nodes
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

fn load_parser(language: tree_sitter::Language, name: &str) -> Result<Mutex<tree_sitter::Parser>> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| Error::Grammar(format!("failed to load {name} grammar: {e}")))?;
    Ok(Mutex::new(parser))
}

fn parse_with(
    parser: &Mutex<tree_sitter::Parser>,
    code: &str,
    language: Language,
) -> Result<ParsedSource> {
    let mut parser = parser
        .lock()
        .map_err(|_| Error::Parse(format!("{language} parser lock poisoned")))?;
    let tree = parser
        .parse(code, None)
        .ok_or_else(|| Error::Parse(format!("{language} parser produced no tree")))?;
    if tree.root_node().has_error() {
        log::debug!("{language} source parsed with error nodes");
    }
    Ok(ParsedSource::new(code, tree))
}
