//! Assertion rendering
//!
//! Turns an [`Observation`] into a Python test statement. Strings embedded in
//! the statement (string results and exception messages) are written as
//! escaped Python string literals, so every statement parses. Non-string
//! values only reach this module when their `repr` evaluates back to an equal
//! value (infinities are spelled `float('inf')`); anything else arrives as
//! [`Outcome::Opaque`] and gets no assertion.

use serde::{Deserialize, Serialize};

use super::harness::{Observation, Outcome};

/// Expected behavior of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Expectation {
    /// The call returns a value equal to `literal`
    Equals {
        /// Python literal of the expected value
        literal: String,
    },
    /// The call raises an exception whose `str()` is `message`
    Raises {
        /// Exception class name
        type_name: String,
        /// Exception message
        message: String,
        /// Needs `except BaseException` to be caught
        #[serde(default)]
        base_exception: bool,
    },
}

/// One oracle: a call and its expected outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Call expression
    pub call: String,
    /// Positional argument literals
    pub arguments: Vec<String>,
    /// Expected outcome
    pub expectation: Expectation,
}

impl Assertion {
    /// Build the assertion for an observation
    ///
    /// Timeouts and values without a literal form have none.
    #[must_use]
    pub fn from_observation(observation: &Observation) -> Option<Self> {
        let expectation = match &observation.outcome {
            Outcome::Value { text, is_str, .. } => Expectation::Equals {
                literal: if *is_str {
                    python_string_literal(text)
                } else {
                    text.clone()
                },
            },
            Outcome::Error {
                type_name,
                message,
                base_exception,
            } => Expectation::Raises {
                type_name: type_name.clone(),
                message: message.clone(),
                base_exception: *base_exception,
            },
            Outcome::Opaque { .. } | Outcome::Timeout => return None,
        };
        Some(Self {
            call: observation.call.clone(),
            arguments: observation.arguments.clone(),
            expectation,
        })
    }

    /// Whether the assertion expects an exception
    #[must_use]
    pub fn expects_error(&self) -> bool {
        matches!(self.expectation, Expectation::Raises { .. })
    }

    /// Python statement text
    #[must_use]
    pub fn statement(&self) -> String {
        match &self.expectation {
            Expectation::Equals { literal } => format!("assert {} == {literal}", self.call),
            Expectation::Raises {
                message,
                base_exception,
                ..
            } => format!(
                "try:\n    {}\nexcept {} as err:\n    assert str(err) == {}",
                self.call,
                if *base_exception {
                    "BaseException"
                } else {
                    "Exception"
                },
                python_string_literal(message)
            ),
        }
    }
}

impl std::fmt::Display for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.statement())
    }
}

/// Single-quoted Python string literal evaluating to `s`
#[must_use]
pub fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, PythonGrammar};
    use proptest::prelude::*;

    fn observation(call: &str, arguments: &[&str], outcome: Outcome) -> Observation {
        Observation {
            call: call.to_string(),
            arguments: arguments.iter().map(|a| (*a).to_string()).collect(),
            outcome,
        }
    }

    fn value(text: &str, is_str: bool) -> Outcome {
        Outcome::Value {
            text: text.to_string(),
            is_str,
            type_name: if is_str { "str" } else { "int" }.to_string(),
        }
    }

    fn unescape(literal: &str) -> String {
        let inner = &literal[1..literal.len() - 1];
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    out.push(char::from_u32(u32::from_str_radix(&hex, 16).unwrap()).unwrap());
                }
                Some(other) => out.push(other),
                None => panic!("dangling escape"),
            }
        }
        out
    }

    #[test]
    fn test_value_assertions() {
        let first = Assertion::from_observation(&observation(
            "add_two(2, 3)",
            &["2", "3"],
            value("5", false),
        ))
        .unwrap();
        let second = Assertion::from_observation(&observation(
            "add_two(0, 0)",
            &["0", "0"],
            value("0", false),
        ))
        .unwrap();
        assert_eq!(first.statement(), "assert add_two(2, 3) == 5");
        assert_eq!(second.statement(), "assert add_two(0, 0) == 0");
        assert!(!first.expects_error());
    }

    #[test]
    fn test_string_result_is_quoted() {
        let assertion = Assertion::from_observation(&observation(
            "area(5)",
            &["5"],
            value("area=12.5", true),
        ))
        .unwrap();
        assert_eq!(assertion.statement(), "assert area(5) == 'area=12.5'");
    }

    #[test]
    fn test_numeric_looking_string_stays_quoted() {
        let assertion =
            Assertion::from_observation(&observation("f()", &[], value("12.5", true))).unwrap();
        assert_eq!(assertion.statement(), "assert f() == '12.5'");
    }

    #[test]
    fn test_error_assertion_block() {
        let assertion = Assertion::from_observation(&observation(
            "div(5, 0)",
            &["5", "0"],
            Outcome::Error {
                type_name: "ZeroDivisionError".into(),
                message: "division by zero".into(),
                base_exception: false,
            },
        ))
        .unwrap();
        assert!(assertion.expects_error());
        assert_eq!(
            assertion.statement(),
            "try:\n    div(5, 0)\nexcept Exception as err:\n    assert str(err) == 'division by zero'"
        );
    }

    #[test]
    fn test_error_message_with_quotes_and_newlines_is_escaped() {
        let assertion = Assertion::from_observation(&observation(
            "f('x')",
            &["'x'"],
            Outcome::Error {
                type_name: "KeyError".into(),
                message: "'x'\nmissing".into(),
                base_exception: false,
            },
        ))
        .unwrap();
        let statement = assertion.statement();
        assert!(statement.ends_with(r"assert str(err) == '\'x\'\nmissing'"));
        assert_eq!(statement.lines().count(), 4);

        let grammar = PythonGrammar::new().unwrap();
        assert!(grammar.validate(&statement));
    }

    #[test]
    fn test_system_exit_is_caught_as_base_exception() {
        let assertion = Assertion::from_observation(&observation(
            "stop(-1)",
            &["-1"],
            Outcome::Error {
                type_name: "SystemExit".into(),
                message: "1".into(),
                base_exception: true,
            },
        ))
        .unwrap();
        assert_eq!(
            assertion.statement(),
            "try:\n    stop(-1)\nexcept BaseException as err:\n    assert str(err) == '1'"
        );
    }

    #[test]
    fn test_timeout_has_no_assertion() {
        assert!(Assertion::from_observation(&observation("f()", &[], Outcome::Timeout)).is_none());
    }

    #[test]
    fn test_opaque_value_has_no_assertion() {
        let opaque = Outcome::Opaque {
            type_name: "object".into(),
        };
        assert!(Assertion::from_observation(&observation("f()", &[], opaque)).is_none());
    }

    #[test]
    fn test_infinity_literal_is_valid_python() {
        let assertion = Assertion::from_observation(&observation(
            "recip(0)",
            &["0"],
            value("float('inf')", false),
        ))
        .unwrap();
        assert_eq!(assertion.statement(), "assert recip(0) == float('inf')");
        let grammar = PythonGrammar::new().unwrap();
        assert!(grammar.validate(&assertion.statement()));
    }

    #[test]
    fn test_python_string_literal_escapes() {
        assert_eq!(python_string_literal("plain"), "'plain'");
        assert_eq!(python_string_literal("it's"), r"'it\'s'");
        assert_eq!(python_string_literal("a\\b"), r"'a\\b'");
        assert_eq!(python_string_literal("tab\there"), r"'tab\there'");
        assert_eq!(python_string_literal("\u{1}"), r"'\x01'");
        assert_eq!(python_string_literal("héllo"), "'héllo'");
    }

    #[test]
    fn test_call_arguments_round_trip_through_parser() {
        let assertion = Assertion::from_observation(&observation(
            "f([1, 2], 'a, b', (3,), -4.5)",
            &["[1, 2]", "'a, b'", "(3,)", "-4.5"],
            value("True", false),
        ))
        .unwrap();
        let statement = assertion.statement();

        let grammar = PythonGrammar::new().unwrap();
        let parsed = grammar.parse(&statement).unwrap();
        let query = crate::grammar::SyntaxQuery::new(
            &grammar,
            "(assert_statement (comparison_operator (call arguments: (argument_list (_) @arg))))",
        )
        .unwrap();
        let captures = query.evaluate(&parsed);
        assert_eq!(captures.texts("arg"), assertion.arguments);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_string_literal_round_trips(s in "\\PC*|[\\x00-\\x1f'\"\\\\]*") {
            let literal = python_string_literal(&s);
            prop_assert!(literal.starts_with('\'') && literal.ends_with('\''));
            prop_assert!(!literal.contains('\n'));
            prop_assert_eq!(unescape(&literal), s);
        }

        #[test]
        fn prop_rendering_is_deterministic(message in "\\PC{0,40}") {
            let obs = observation(
                "f(1)",
                &["1"],
                Outcome::Error { type_name: "ValueError".into(), message, base_exception: false },
            );
            let a = Assertion::from_observation(&obs).unwrap().statement();
            let b = Assertion::from_observation(&obs).unwrap().statement();
            prop_assert_eq!(a, b);
        }
    }
}
