//! Structural query evaluation over syntax trees
//!
//! A [`SyntaxQuery`] is a compiled tree-sitter pattern with capture labels and
//! text predicates (`#eq?`, `#match?`). Evaluating it against a
//! [`ParsedSource`] yields a [`CaptureSet`]: for every label, the exact source
//! text of every captured node in document order.

use std::collections::BTreeMap;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Query, QueryCursor, QueryErrorKind};

use crate::{Error, Language, Result};

use super::{Grammar, ParsedSource};

/// One captured node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Byte-exact source text of the node
    pub text: String,
    /// Start offset in the source
    pub start_byte: usize,
    /// End offset in the source
    pub end_byte: usize,
}

/// Captures of one query evaluation, grouped by label
///
/// A label with no matches is absent from the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSet {
    groups: BTreeMap<String, Vec<Capture>>,
}

impl CaptureSet {
    /// Captures for a label, empty when it matched nothing
    #[must_use]
    pub fn get(&self, name: &str) -> &[Capture] {
        self.groups.get(name).map_or(&[], Vec::as_slice)
    }

    /// Captured texts for a label
    #[must_use]
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.get(name).iter().map(|c| c.text.as_str()).collect()
    }

    /// Whether a label matched at least once
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Labels that matched, in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of labels that matched
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether nothing matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Captures for a label that must have matched
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapture`] if the label is absent
    pub fn require(&self, name: &str) -> Result<&[Capture]> {
        match self.groups.get(name) {
            Some(captures) if !captures.is_empty() => Ok(captures),
            _ => Err(Error::MissingCapture {
                capture: name.to_string(),
            }),
        }
    }

    /// The single capture for a label that must match exactly once
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapture`] or [`Error::AmbiguousCapture`]
    pub fn require_one(&self, name: &str) -> Result<&Capture> {
        match self.require(name)? {
            [only] => Ok(only),
            many => Err(Error::AmbiguousCapture {
                capture: name.to_string(),
                count: many.len(),
            }),
        }
    }

    fn push(&mut self, name: &str, capture: Capture) {
        let group = self.groups.entry(name.to_string()).or_default();
        let seen = group
            .iter()
            .any(|c| c.start_byte == capture.start_byte && c.end_byte == capture.end_byte);
        if !seen {
            group.push(capture);
        }
    }
}

/// A compiled structural query for one language
pub struct SyntaxQuery {
    language: Language,
    query: Query,
}

impl std::fmt::Debug for SyntaxQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxQuery")
            .field("language", &self.language)
            .field("captures", &self.query.capture_names())
            .field("patterns", &self.query.pattern_count())
            .finish()
    }
}

impl SyntaxQuery {
    /// Compile a query pattern against a grammar
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the pattern is malformed. This is a
    /// configuration error and must not be ignored.
    pub fn new(grammar: &dyn Grammar, pattern: &str) -> Result<Self> {
        let query = Query::new(&grammar.ts_language(), pattern).map_err(|e| {
            let kind = match e.kind {
                QueryErrorKind::Syntax => "syntax error",
                QueryErrorKind::NodeType => "unknown node type",
                QueryErrorKind::Field => "unknown field name",
                QueryErrorKind::Capture => "unknown capture name",
                QueryErrorKind::Structure => "invalid query structure",
                QueryErrorKind::Predicate => "invalid predicate",
                QueryErrorKind::Language => "language error",
            };
            Error::Query(format!(
                "{} query, row {} column {}: {kind}: {}",
                grammar.language(),
                e.row,
                e.column,
                e.message
            ))
        })?;
        Ok(Self {
            language: grammar.language(),
            query,
        })
    }

    /// Language the query was compiled for
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Capture labels declared by the pattern
    #[must_use]
    pub fn capture_names(&self) -> &[&str] {
        self.query.capture_names()
    }

    /// Evaluate the query over a parsed source in a single traversal
    #[must_use]
    pub fn evaluate(&self, parsed: &ParsedSource) -> CaptureSet {
        let names = self.query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&self.query, parsed.root(), parsed.source().as_bytes());

        let mut set = CaptureSet::default();
        while let Some((m, index)) = captures.next() {
            let capture = m.captures[*index];
            let Some(name) = names.get(capture.index as usize) else {
                continue;
            };
            let node = capture.node;
            set.push(
                name,
                Capture {
                    text: parsed.text(node).to_string(),
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                },
            );
        }
        log::debug!(
            "{} query captured {} labels ({})",
            self.language,
            set.len(),
            set.names().collect::<Vec<_>>().join(", ")
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{CppGrammar, PythonGrammar};

    const PY_SOURCE: &str = "import math\n\ndef f_gold(a, b):\n    return a + b\n\ndef helper():\n    return 0\n";

    #[test]
    fn test_captures_exact_text_in_document_order() {
        let grammar = PythonGrammar::new().unwrap();
        let query = SyntaxQuery::new(
            &grammar,
            "(function_definition name: (identifier) @name) @func",
        )
        .unwrap();
        let parsed = grammar.parse(PY_SOURCE).unwrap();
        let set = query.evaluate(&parsed);

        assert_eq!(set.texts("name"), vec!["f_gold", "helper"]);
        assert_eq!(
            set.get("func")[0].text,
            "def f_gold(a, b):\n    return a + b"
        );
    }

    #[test]
    fn test_eq_predicate_filters_matches() {
        let grammar = PythonGrammar::new().unwrap();
        let query = SyntaxQuery::new(
            &grammar,
            r#"(function_definition name: ((identifier) @name (#eq? @name "helper"))) @func"#,
        )
        .unwrap();
        let parsed = grammar.parse(PY_SOURCE).unwrap();
        let set = query.evaluate(&parsed);

        assert_eq!(set.texts("name"), vec!["helper"]);
        assert_eq!(set.get("func").len(), 1);
    }

    #[test]
    fn test_absent_label_means_zero_matches() {
        let grammar = PythonGrammar::new().unwrap();
        let query = SyntaxQuery::new(&grammar, "(import_from_statement) @from").unwrap();
        let parsed = grammar.parse(PY_SOURCE).unwrap();
        let set = query.evaluate(&parsed);

        assert!(!set.contains("from"));
        assert!(set.get("from").is_empty());
        assert!(matches!(
            set.require("from"),
            Err(Error::MissingCapture { .. })
        ));
    }

    #[test]
    fn test_require_one_rejects_multiple() {
        let grammar = PythonGrammar::new().unwrap();
        let query = SyntaxQuery::new(&grammar, "(function_definition) @func").unwrap();
        let parsed = grammar.parse(PY_SOURCE).unwrap();
        let set = query.evaluate(&parsed);

        assert!(matches!(
            set.require_one("func"),
            Err(Error::AmbiguousCapture { count: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_query_is_error() {
        let grammar = CppGrammar::new().unwrap();
        let err = SyntaxQuery::new(&grammar, "(function_definition @func").unwrap_err();
        assert!(matches!(err, Error::Query(_)));

        let err = SyntaxQuery::new(&grammar, "(no_such_node) @x").unwrap_err();
        assert!(err.to_string().contains("unknown node type"));
    }

    #[test]
    fn test_capture_byte_range_matches_text() {
        let grammar = CppGrammar::new().unwrap();
        let source = "#include <cstdio>\nint f_gold(int n) { return n; }\n";
        let query = SyntaxQuery::new(&grammar, "(function_definition) @func").unwrap();
        let parsed = grammar.parse(source).unwrap();
        let set = query.evaluate(&parsed);
        let func = set.require_one("func").unwrap();

        assert_eq!(&source[func.start_byte..func.end_byte], func.text);
    }
}
