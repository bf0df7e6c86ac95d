//! Sandboxed Python execution for oracle synthesis
//!
//! The gold implementations come from a third-party dataset, so they run in a
//! separate interpreter process:
//! 1. **Interpreter flags**: `-S -s -B -u` (no site packages, no user site,
//!    no bytecode files, unbuffered output)
//! 2. **Clean environment**: only a fixed hash seed and I/O encoding are set
//! 3. **Import restrictions**: the harness gives every evaluation namespace
//!    its own builtins with a guarded `__import__`
//! 4. **Builtin restrictions**: `eval`, `exec`, `compile`, `open`, ... are
//!    removed from those builtins
//! 5. **Time limits**: per-call interval timer plus a per-process deadline
//! 6. **Output limits**: stdout/stderr are truncated

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Language, Result};

use super::executor::{wait_with_timeout, Executor};
use super::ExecutionResult;

/// Default modules the gold implementations may not import
pub const DEFAULT_BLOCKED_MODULES: &[&str] = &[
    // System/process access
    "os",
    "subprocess",
    "shutil",
    "pathlib",
    "glob",
    "tempfile",
    // Network access
    "socket",
    "http",
    "urllib",
    "requests",
    "ftplib",
    "smtplib",
    "ssl",
    // Code execution/compilation
    "code",
    "codeop",
    "importlib",
    "runpy",
    // Dangerous internals
    "ctypes",
    "cffi",
    "multiprocessing",
    "threading",
    "_thread",
    "signal",
    "resource",
    // File operations
    "pickle",
    "shelve",
    "dbm",
    "sqlite3",
    // Misc dangerous
    "pty",
    "tty",
    "termios",
    "fcntl",
    "mmap",
];

/// Sandbox configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Path to the Python interpreter
    pub interpreter: String,
    /// Maximum wall-clock time of one call in milliseconds (0 disables)
    pub call_timeout_ms: u64,
    /// Maximum wall-clock time of one task's interpreter process
    pub task_timeout_ms: u64,
    /// Maximum stdout/stderr size in bytes
    pub max_output_bytes: usize,
    /// Modules the fragment may not import
    pub blocked_modules: Vec<String>,
    /// Keep `open` available to the fragment
    pub allow_file_io: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            call_timeout_ms: 2000,
            task_timeout_ms: 60_000,
            max_output_bytes: 16 * 1024 * 1024,
            blocked_modules: DEFAULT_BLOCKED_MODULES
                .iter()
                .map(|&s| s.to_string())
                .collect(),
            allow_file_io: false,
        }
    }
}

impl SandboxConfig {
    /// Short limits for tests and smoke runs
    #[must_use]
    pub fn strict() -> Self {
        Self {
            call_timeout_ms: 500,
            task_timeout_ms: 10_000,
            max_output_bytes: 1024 * 1024,
            ..Self::default()
        }
    }

    /// Set the interpreter path
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_call_timeout(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    /// Set the per-task timeout
    #[must_use]
    pub fn with_task_timeout(mut self, timeout_ms: u64) -> Self {
        self.task_timeout_ms = timeout_ms;
        self
    }

    /// Add additional blocked modules
    #[must_use]
    pub fn with_blocked_modules(mut self, modules: &[&str]) -> Self {
        for module in modules {
            if !self.blocked_modules.iter().any(|m| m == module) {
                self.blocked_modules.push((*module).to_string());
            }
        }
        self
    }

    /// Allow file I/O (not recommended for untrusted code)
    #[must_use]
    pub fn with_file_io(mut self, allow: bool) -> Self {
        self.allow_file_io = allow;
        self
    }

    /// Check the limits are usable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty interpreter or a zero
    /// task timeout
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(Error::Configuration("interpreter path is empty".into()));
        }
        if self.task_timeout_ms == 0 {
            return Err(Error::Configuration("task timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Python executor running each program in a fresh, isolated interpreter
#[derive(Debug, Clone)]
pub struct SandboxedPythonExecutor {
    interpreter: String,
    max_output_bytes: usize,
}

impl Default for SandboxedPythonExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxedPythonExecutor {
    /// Create a new executor using `python3`
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&SandboxConfig::default())
    }

    /// Create an executor from a sandbox configuration
    #[must_use]
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    /// Check if the Python interpreter is available
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.interpreter)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

impl Executor for SandboxedPythonExecutor {
    fn execute(&self, code: &str, input: &str, timeout_ms: u64) -> Result<ExecutionResult> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let start = Instant::now();

        let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_file = std::env::temp_dir().join(format!(
            "goldpair_sandbox_{}_{}.py",
            std::process::id(),
            unique_id
        ));
        std::fs::write(&temp_file, code)
            .map_err(|e| Error::Oracle(format!("failed to write sandbox file: {e}")))?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-S") // Don't import site module
            .arg("-s") // Don't add user site directory
            .arg("-B") // Don't write bytecode
            .arg("-u") // Unbuffered output
            .arg(&temp_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .env("PYTHONHASHSEED", "0")
            .env("PYTHONIOENCODING", "utf-8");

        let mut child = cmd.spawn().map_err(|e| {
            let _ = std::fs::remove_file(&temp_file);
            Error::Oracle(format!("failed to spawn {}: {e}", self.interpreter))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(input.as_bytes());
        }

        let output = wait_with_timeout(child, Duration::from_millis(timeout_ms));
        let _ = std::fs::remove_file(&temp_file);
        let output = output?;

        Ok(ExecutionResult {
            stdout: truncate_output(&output.stdout, self.max_output_bytes),
            stderr: truncate_output(&output.stderr, self.max_output_bytes),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

/// Truncate output to maximum size with message
fn truncate_output(data: &[u8], max_bytes: usize) -> String {
    let s = String::from_utf8_lossy(data);
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        let mut end = max_bytes;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n... [output truncated at {max_bytes} bytes]", &s[..end])
    }
}
