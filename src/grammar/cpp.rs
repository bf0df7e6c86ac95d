//! C++ grammar definition

use std::sync::Mutex;

use crate::{Language, Result};

use super::{load_parser, parse_with, Grammar, ParsedSource};

/// C++ grammar backed by tree-sitter-cpp
pub struct CppGrammar {
    parser: Mutex<tree_sitter::Parser>,
}

impl std::fmt::Debug for CppGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CppGrammar")
            .field("language", &"cpp")
            .finish()
    }
}

impl CppGrammar {
    /// Create a new C++ grammar
    ///
    /// # Errors
    ///
    /// Returns an error if the tree-sitter C++ grammar fails to load
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: load_parser(tree_sitter_cpp::LANGUAGE.into(), "C++")?,
        })
    }
}

impl Grammar for CppGrammar {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_cpp::LANGUAGE.into()
    }

    fn parse(&self, code: &str) -> Result<ParsedSource> {
        parse_with(&self.parser, code, Language::Cpp)
    }
}
