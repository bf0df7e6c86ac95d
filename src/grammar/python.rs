//! Python grammar definition
//!
//! Python is the execution language: its files carry the `f_gold`
//! implementation and the `param` list that drives oracle synthesis.

use std::sync::Mutex;

use crate::{Language, Result};

use super::{load_parser, parse_with, Grammar, ParsedSource};

/// Python grammar backed by tree-sitter-python
pub struct PythonGrammar {
    parser: Mutex<tree_sitter::Parser>,
}

impl std::fmt::Debug for PythonGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonGrammar")
            .field("language", &"python")
            .finish()
    }
}

impl PythonGrammar {
    /// Create a new Python grammar
    ///
    /// # Errors
    ///
    /// Returns an error if the tree-sitter Python grammar fails to load
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: load_parser(tree_sitter_python::LANGUAGE.into(), "Python")?,
        })
    }
}

impl Grammar for PythonGrammar {
    fn language(&self) -> Language {
        Language::Python
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn parse(&self, code: &str) -> Result<ParsedSource> {
        parse_with(&self.parser, code, Language::Python)
    }
}
