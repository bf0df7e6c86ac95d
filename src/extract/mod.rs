//! Fragment extraction
//!
//! Pulls the dependency declarations and the sentinel-named gold function out
//! of a source file, renames the function after its task and assembles a
//! self-contained [`Fragment`]. For the execution language the literal
//! `param = [...]` list is extracted as well.
//!
//! # Example
//!
//! ```rust,no_run
//! use goldpair::extract::extractor_for;
//! use goldpair::Language;
//!
//! let extractor = extractor_for(Language::Python)?;
//! let source = "import math\ndef f_gold(r):\n    return math.pi * r * r\n\nparam = [(1,), (2,)]\n";
//! let extraction = extractor.extract(source, "circle_area")?;
//! assert!(extraction.fragment.code().contains("def circle_area(r):"));
//! assert_eq!(extraction.parameters.as_deref(), Some("[(1,), (2,)]"));
//! # Ok::<(), goldpair::Error>(())
//! ```

mod cpp;
mod python;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grammar::{grammar_for, CaptureSet, Grammar, ParsedSource, SyntaxQuery};
use crate::{Error, Language, Result};

/// Name of the gold implementation in every source file
pub const F_GOLD: &str = "f_gold";

/// Name of the parameter-list variable in execution-language files
pub const PARAM: &str = "param";

const FUNC: &str = "func";
const FUNC_NAME: &str = "func_name";
const VAR_VALUE: &str = "var_value";

/// How the sentinel name is replaced inside the extracted function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameStrategy {
    /// Replace identifier nodes only; strings and comments are untouched
    #[default]
    Identifier,
    /// Replace every textual occurrence, including inside strings and comments
    Textual,
}

impl FromStr for RenameStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identifier" | "ast" => Ok(Self::Identifier),
            "textual" | "text" => Ok(Self::Textual),
            other => Err(Error::Configuration(format!(
                "unknown rename strategy '{other}'"
            ))),
        }
    }
}

/// What to do when several functions carry the sentinel name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Take the first definition in document order
    #[default]
    First,
    /// Fail the task
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(Self::First),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Configuration(format!(
                "unknown duplicate policy '{other}'"
            ))),
        }
    }
}

/// A renamed, dependency-prefixed function ready to stand on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    language: Language,
    function: String,
    code: String,
}

impl Fragment {
    /// Language of the fragment
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Name the gold function was renamed to
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Fragment source text
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consume the fragment, returning its source text
    #[must_use]
    pub fn into_code(self) -> String {
        self.code
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

/// The gold function as it appears in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFunction {
    /// Exact definition text
    pub text: String,
    /// Start offset in the source
    pub start_byte: usize,
    /// End offset in the source
    pub end_byte: usize,
}

/// Result of extracting one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Renamed fragment
    pub fragment: Fragment,
    /// Literal text of the parameter list, for the execution language
    pub parameters: Option<String>,
}

/// Query-driven extractor for one language
pub struct SourceExtractor {
    grammar: Box<dyn Grammar>,
    query: SyntaxQuery,
    dependency_captures: &'static [&'static str],
    with_parameters: bool,
    rename: RenameStrategy,
    on_duplicate: DuplicatePolicy,
}

impl std::fmt::Debug for SourceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceExtractor")
            .field("language", &self.grammar.language())
            .field("with_parameters", &self.with_parameters)
            .field("rename", &self.rename)
            .field("on_duplicate", &self.on_duplicate)
            .finish()
    }
}

/// Create the extractor for a language
///
/// Python extractors also extract the parameter list.
///
/// # Errors
///
/// Returns an error if the grammar cannot be loaded or the query is malformed
pub fn extractor_for(language: Language) -> Result<SourceExtractor> {
    SourceExtractor::new(language)
}

impl SourceExtractor {
    /// Create the extractor for a language with default policies
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar cannot be loaded or the query is malformed
    pub fn new(language: Language) -> Result<Self> {
        let grammar = grammar_for(language)?;
        let (pattern, dependency_captures) = match language {
            Language::Cpp => (cpp::query_pattern(F_GOLD), cpp::DEPENDENCY_CAPTURES),
            Language::Python => (
                python::query_pattern(F_GOLD, PARAM),
                python::DEPENDENCY_CAPTURES,
            ),
        };
        let query = SyntaxQuery::new(grammar.as_ref(), &pattern)?;
        Ok(Self {
            grammar,
            query,
            dependency_captures,
            with_parameters: language == Language::Python,
            rename: RenameStrategy::default(),
            on_duplicate: DuplicatePolicy::default(),
        })
    }

    /// Language handled by this extractor
    #[must_use]
    pub fn language(&self) -> Language {
        self.grammar.language()
    }

    /// Set the rename strategy
    #[must_use]
    pub fn with_rename(mut self, rename: RenameStrategy) -> Self {
        self.rename = rename;
        self
    }

    /// Set the duplicate sentinel policy
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.on_duplicate = policy;
        self
    }

    /// Enable or disable parameter-list extraction
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when enabling it for a language
    /// without a parameter-list query
    pub fn with_parameters(mut self, enabled: bool) -> Result<Self> {
        if enabled && self.language() != Language::Python {
            return Err(Error::Configuration(format!(
                "{} sources carry no parameter list",
                self.language()
            )));
        }
        self.with_parameters = enabled;
        Ok(self)
    }

    /// Parse and query a source file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the source cannot be parsed
    pub fn capture(&self, source: &str) -> Result<(ParsedSource, CaptureSet)> {
        let parsed = self.grammar.parse(source)?;
        let captures = self.query.evaluate(&parsed);
        Ok((parsed, captures))
    }

    /// Dependency declarations in source order, trailing whitespace trimmed
    #[must_use]
    pub fn extract_dependencies(&self, captures: &CaptureSet) -> Vec<String> {
        let mut found: Vec<_> = self
            .dependency_captures
            .iter()
            .flat_map(|name| captures.get(name))
            .collect();
        found.sort_by_key(|c| c.start_byte);
        found
            .into_iter()
            .map(|c| c.text.trim_end().to_string())
            .collect()
    }

    /// The single sentinel-named function definition
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapture`] if no function carries the sentinel
    /// name, or [`Error::AmbiguousCapture`] for duplicates under
    /// [`DuplicatePolicy::Reject`]
    pub fn extract_target_function(&self, captures: &CaptureSet) -> Result<TargetFunction> {
        let functions = captures.require(FUNC)?;
        captures.require(FUNC_NAME)?;
        if functions.len() > 1 {
            match self.on_duplicate {
                DuplicatePolicy::Reject => {
                    return Err(Error::AmbiguousCapture {
                        capture: FUNC.to_string(),
                        count: functions.len(),
                    })
                }
                DuplicatePolicy::First => log::warn!(
                    "{} definitions named {F_GOLD}, using the first",
                    functions.len()
                ),
            }
        }
        let first = &functions[0];
        Ok(TargetFunction {
            text: first.text.clone(),
            start_byte: first.start_byte,
            end_byte: first.end_byte,
        })
    }

    /// Literal source text of the `param = [...]` list
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one such assignment exists
    pub fn extract_parameter_list(&self, captures: &CaptureSet) -> Result<String> {
        if self.language() != Language::Python {
            return Err(Error::Configuration(format!(
                "{} sources carry no parameter list",
                self.language()
            )));
        }
        Ok(captures.require_one(VAR_VALUE)?.text.clone())
    }

    /// Extract, rename and assemble the fragment of one source file
    ///
    /// # Errors
    ///
    /// Returns an error if `new_name` is not an identifier, the source cannot
    /// be parsed, or a required capture is missing or ambiguous
    pub fn extract(&self, source: &str, new_name: &str) -> Result<Extraction> {
        if !is_identifier(new_name) {
            return Err(Error::InvalidTaskName(new_name.to_string()));
        }
        let (parsed, captures) = self.capture(source)?;
        let dependencies = self.extract_dependencies(&captures);
        let target = self.extract_target_function(&captures)?;
        let renamed = match self.rename {
            RenameStrategy::Textual => rename(&target.text, F_GOLD, new_name),
            RenameStrategy::Identifier => rename_identifiers(
                &parsed,
                &target,
                self.grammar.identifier_kinds(),
                F_GOLD,
                new_name,
            ),
        };
        let parameters = if self.with_parameters {
            Some(self.extract_parameter_list(&captures)?)
        } else {
            None
        };
        Ok(Extraction {
            fragment: assemble_fragment(self.language(), new_name, &dependencies, &renamed),
            parameters,
        })
    }
}

/// Replace every occurrence of `from` with `to`, scope-unaware
#[must_use]
pub fn rename(function_text: &str, from: &str, to: &str) -> String {
    function_text.replace(from, to)
}

/// Replace identifier nodes spelled `from` inside the target function
#[must_use]
pub fn rename_identifiers(
    parsed: &ParsedSource,
    target: &TargetFunction,
    identifier_kinds: &[&str],
    from: &str,
    to: &str,
) -> String {
    let (start, end) = (target.start_byte, target.end_byte);
    let mut edits = Vec::new();
    let mut stack = vec![parsed.root()];
    while let Some(node) = stack.pop() {
        if node.end_byte() <= start || node.start_byte() >= end {
            continue;
        }
        if identifier_kinds.contains(&node.kind()) && parsed.text(node) == from {
            edits.push((node.start_byte(), node.end_byte()));
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    edits.sort_unstable();

    let source = parsed.source();
    let mut renamed = String::with_capacity(target.text.len());
    let mut pos = start;
    for (edit_start, edit_end) in edits {
        renamed.push_str(source.get(pos..edit_start).unwrap_or_default());
        renamed.push_str(to);
        pos = edit_end;
    }
    renamed.push_str(source.get(pos..end).unwrap_or_default());
    renamed
}

/// Join dependencies and the function text with newlines
#[must_use]
pub fn assemble_fragment(
    language: Language,
    function: &str,
    dependencies: &[String],
    function_text: &str,
) -> Fragment {
    let code = dependencies
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(function_text))
        .collect::<Vec<_>>()
        .join("\n");
    Fragment {
        language,
        function: function.to_string(),
        code,
    }
}

// Case-sensitive, as the languages treat them
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

/// Whether a name can be used as a function name in every supported language
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !PYTHON_KEYWORDS.contains(&name)
        && !CPP_KEYWORDS.contains(&name)
}

/// Function name for a task: its lowercased basename
///
/// # Errors
///
/// Returns [`Error::InvalidTaskName`] if the lowercased name is not an identifier
pub fn task_function_name(task: &str) -> Result<String> {
    let name = task.to_lowercase();
    if is_identifier(&name) {
        Ok(name)
    } else {
        Err(Error::InvalidTaskName(task.to_string()))
    }
}
