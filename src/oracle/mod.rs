//! Test-oracle synthesis
//!
//! The oracle runs a renamed Python fragment on every declared parameter
//! tuple and records what happened. Each observation becomes an
//! [`Assertion`]: an equality check for a returned value or a try/except
//! block for a raised exception.
//!
//! # Isolation
//!
//! Every task gets its own interpreter process, created for the task and gone
//! when synthesis finishes. Inside it, the fragment is loaded into a fresh
//! namespace for each call, so nothing a call does is visible to the next one
//! or to any other task.
//!
//! # Example
//!
//! ```rust,no_run
//! use goldpair::extract::extractor_for;
//! use goldpair::oracle::{OracleSynthesizer, SandboxConfig};
//! use goldpair::Language;
//!
//! let source = "def f_gold(a, b):\n    return a + b\n\nparam = [(2, 3), (0, 0)]\n";
//! let extraction = extractor_for(Language::Python)?.extract(source, "add_two")?;
//! let oracle = OracleSynthesizer::new(SandboxConfig::default());
//! let synthesis = oracle.synthesize(&extraction.fragment, extraction.parameters.as_deref().unwrap_or("[]"))?;
//! assert_eq!(synthesis.statements(), vec!["assert add_two(2, 3) == 5", "assert add_two(0, 0) == 0"]);
//! # Ok::<(), goldpair::Error>(())
//! ```

mod executor;
mod harness;
mod render;
mod sandbox;

pub use executor::Executor;
pub use harness::{Observation, OracleReport, OracleRequest, Outcome, HARNESS, REPORT_MARKER};
pub use render::{python_string_literal, Assertion, Expectation};
pub use sandbox::{SandboxConfig, SandboxedPythonExecutor, DEFAULT_BLOCKED_MODULES};

use crate::extract::Fragment;
use crate::{Error, Language, Result};

/// Result of executing code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code
    pub exit_code: i32,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// Assertions synthesized for one task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synthesis {
    /// One assertion per parameter tuple that produced an oracle, in order
    pub assertions: Vec<Assertion>,
    /// Parameter tuples dropped because the call timed out
    pub timeouts: usize,
    /// Parameter tuples dropped because the result has no literal form
    pub unrepresentable: usize,
}

impl Synthesis {
    /// Statement texts in declaration order
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.assertions.iter().map(Assertion::statement).collect()
    }

    /// Number of assertions expecting an exception
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.assertions.iter().filter(|a| a.expects_error()).count()
    }
}

/// Runs fragments in a sandboxed interpreter and renders assertions
pub struct OracleSynthesizer {
    executor: Box<dyn Executor>,
    config: SandboxConfig,
}

impl std::fmt::Debug for OracleSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSynthesizer")
            .field("executor", &format!("<{}>", self.executor.language()))
            .field("config", &self.config)
            .finish()
    }
}

impl OracleSynthesizer {
    /// Create a synthesizer backed by a sandboxed Python interpreter
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            executor: Box::new(SandboxedPythonExecutor::from_config(&config)),
            config,
        }
    }

    /// Create a synthesizer with a custom executor
    #[must_use]
    pub fn with_executor(executor: Box<dyn Executor>, config: SandboxConfig) -> Self {
        Self { executor, config }
    }

    /// Sandbox configuration in use
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run the fragment on every tuple of the parameter list
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is not Python, the interpreter fails
    /// or times out as a whole, the parameter list is not a literal, or the
    /// fragment cannot be loaded
    pub fn observe(&self, fragment: &Fragment, params: &str) -> Result<Vec<Observation>> {
        if fragment.language() != Language::Python || self.executor.language() != Language::Python
        {
            return Err(Error::Configuration(format!(
                "oracles run Python fragments, got a {} fragment",
                fragment.language()
            )));
        }

        let request = OracleRequest {
            fragment: fragment.code(),
            function: fragment.function(),
            params,
            call_timeout_ms: self.config.call_timeout_ms,
            blocked_modules: &self.config.blocked_modules,
            allow_file_io: self.config.allow_file_io,
        };
        let input = serde_json::to_string(&request)?;
        let result = self
            .executor
            .execute(HARNESS, &input, self.config.task_timeout_ms)?;
        log::debug!(
            "oracle for {} ran in {}ms (exit {})",
            fragment.function(),
            result.duration_ms,
            result.exit_code
        );

        if result.exit_code != 0 {
            let tail = last_line(&result.stderr)
                .or_else(|| last_line(&result.stdout))
                .unwrap_or("no output");
            return Err(Error::Oracle(format!(
                "harness exited with status {}: {tail}",
                result.exit_code
            )));
        }

        let report = OracleReport::from_stdout(&result.stdout)?;
        if let Some(err) = report.params_error {
            return Err(Error::Oracle(format!("parameter list is not a literal: {err}")));
        }
        if let Some(err) = report.load_error {
            return Err(Error::Oracle(format!("fragment failed to load: {err}")));
        }
        if let Some(err) = report.sandbox_error {
            return Err(Error::Oracle(format!("call blocked by sandbox: {err}")));
        }
        Ok(report.outcomes)
    }

    /// Synthesize one assertion per parameter tuple
    ///
    /// Tuples whose call timed out yield no assertion and are counted in
    /// [`Synthesis::timeouts`]; results without a literal form are counted in
    /// [`Synthesis::unrepresentable`].
    ///
    /// # Errors
    ///
    /// See [`OracleSynthesizer::observe`]
    pub fn synthesize(&self, fragment: &Fragment, params: &str) -> Result<Synthesis> {
        let observations = self.observe(fragment, params)?;
        let mut synthesis = Synthesis::default();
        for observation in &observations {
            match Assertion::from_observation(observation) {
                Some(assertion) => {
                    log::debug!("{}: {}", fragment.function(), assertion.statement());
                    synthesis.assertions.push(assertion);
                }
                None => match &observation.outcome {
                    Outcome::Opaque { type_name } => {
                        log::warn!(
                            "{} returned a {type_name} with no literal form, no assertion generated",
                            observation.call
                        );
                        synthesis.unrepresentable += 1;
                    }
                    _ => {
                        log::warn!(
                            "{} exceeded {}ms, no assertion generated",
                            observation.call,
                            self.config.call_timeout_ms
                        );
                        synthesis.timeouts += 1;
                    }
                },
            }
        }
        Ok(synthesis)
    }
}

fn last_line(output: &str) -> Option<&str> {
    output.lines().rev().map(str::trim).find(|line| !line.is_empty())
}
