//! Python side of oracle synthesis
//!
//! The harness runs inside a fresh interpreter per task. It reads an
//! [`OracleRequest`] as JSON on stdin, evaluates the parameter list with
//! `ast.literal_eval`, loads the fragment into a fresh namespace for every
//! call and reports one [`Observation`] per parameter tuple. The report is
//! printed on a single line prefixed with [`REPORT_MARKER`]; anything the
//! function prints is swallowed.
//!
//! Builtins and modules the sandbox withholds raise a dedicated
//! `BaseException` that the function under test cannot catch as an ordinary
//! error. Any denial is recorded and ends the run with
//! [`OracleReport::sandbox_error`], so it never turns into an oracle.

use serde::{Deserialize, Serialize};

/// Prefix of the report line on the harness stdout
pub const REPORT_MARKER: &str = "@@goldpair-report@@";

/// Harness program executed by the sandboxed interpreter
pub const HARNESS: &str = r#"import ast as _ast
import builtins as _builtins
import contextlib as _contextlib
import io as _io
import json as _json
import signal as _signal
import sys as _sys

_MARKER = "@@goldpair-report@@"
_NON_FINITE = {"inf": "float('inf')", "-inf": "float('-inf')"}
_DENIALS = []


class _CallTimeout(BaseException):
    pass


class _SandboxDenied(BaseException):
    pass


def _on_alarm(signum, frame):
    raise _CallTimeout()


def _deny(message):
    _DENIALS.append(message)
    raise _SandboxDenied(message)


def _denied_builtin(name):
    def stub(*args, **kwargs):
        _deny(f"builtin '{name}' is not allowed in sandbox")

    return stub


def _sandbox_builtins(blocked, allow_file_io):
    table = dict(vars(_builtins))
    original_import = _builtins.__import__

    def guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
        if name.split(".")[0] in blocked:
            _deny(f"Module '{name}' is not allowed in sandbox")
        return original_import(name, globals, locals, fromlist, level)

    table["__import__"] = guarded_import
    denied = ["eval", "exec", "compile", "breakpoint", "help", "input", "exit", "quit"]
    if not allow_file_io:
        denied.append("open")
    for name in denied:
        table[name] = _denied_builtin(name)
    return table


def _fresh_namespace(table):
    return {"__builtins__": dict(table), "__name__": "__goldpair__"}


def _arguments(param):
    return param if isinstance(param, (tuple, list)) else (param,)


def _value_outcome(value):
    type_name = type(value).__name__
    if isinstance(value, str):
        return {"kind": "value", "type": type_name, "is_str": True, "text": str(value)}
    try:
        text = repr(value)
        if isinstance(value, float) and text in _NON_FINITE:
            text = _NON_FINITE[text]
        elif not bool(_ast.literal_eval(text) == value):
            text = None
    except BaseException:
        text = None
    if text is None:
        return {"kind": "opaque", "type": type_name}
    return {"kind": "value", "type": type_name, "is_str": False, "text": text}


def _run(request):
    report = {"load_error": None, "params_error": None, "sandbox_error": None, "outcomes": []}
    try:
        params = _ast.literal_eval(request["params"])
    except (ValueError, TypeError, SyntaxError, MemoryError, RecursionError) as exc:
        report["params_error"] = f"{type(exc).__name__}: {exc}"
        return report
    if not isinstance(params, (list, tuple)):
        report["params_error"] = f"expected a list literal, got {type(params).__name__}"
        return report

    table = _sandbox_builtins(set(request["blocked_modules"]), request["allow_file_io"])
    sink = _io.StringIO()
    try:
        with _contextlib.redirect_stdout(sink):
            exec(request["fragment"], _fresh_namespace(table))
    except _SandboxDenied:
        pass
    except BaseException as exc:
        report["load_error"] = f"{type(exc).__name__}: {exc}"
        return report
    if _DENIALS:
        report["load_error"] = _DENIALS[0]
        return report

    limit = request["call_timeout_ms"] / 1000.0
    timed = limit > 0 and hasattr(_signal, "setitimer")
    if timed:
        _signal.signal(_signal.SIGALRM, _on_alarm)

    for param in params:
        arguments = [repr(arg) for arg in _arguments(param)]
        call = f"{request['function']}({', '.join(arguments)})"
        outcome = {"call": call, "arguments": arguments}
        namespace = _fresh_namespace(table)
        try:
            with _contextlib.redirect_stdout(sink):
                exec(request["fragment"], namespace)
                if timed:
                    _signal.setitimer(_signal.ITIMER_REAL, limit)
                try:
                    value = eval(call, namespace)
                finally:
                    if timed:
                        _signal.setitimer(_signal.ITIMER_REAL, 0)
        except _CallTimeout:
            outcome["kind"] = "timeout"
        except _SandboxDenied:
            pass
        except BaseException as exc:
            outcome.update(
                kind="error",
                type=type(exc).__name__,
                message=str(exc),
                base_exception=not isinstance(exc, Exception),
            )
        else:
            with _contextlib.redirect_stdout(sink):
                outcome.update(_value_outcome(value))
        sink.seek(0)
        sink.truncate()
        if _DENIALS:
            report["sandbox_error"] = f"{call}: {_DENIALS[0]}"
            return report
        report["outcomes"].append(outcome)
    return report


_report = _run(_json.loads(_sys.stdin.read()))
_sys.stdout.write(_MARKER + _json.dumps(_report) + "\n")
"#;

/// Request sent to the harness on stdin
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest<'a> {
    /// Self-contained fragment source
    pub fragment: &'a str,
    /// Name of the function to call
    pub function: &'a str,
    /// Literal text of the parameter list
    pub params: &'a str,
    /// Per-call limit in milliseconds, 0 disables it
    pub call_timeout_ms: u64,
    /// Modules the fragment may not import
    pub blocked_modules: &'a [String],
    /// Keep `open` available
    pub allow_file_io: bool,
}

/// Report printed by the harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReport {
    /// Error raised while loading the fragment
    pub load_error: Option<String>,
    /// Error raised while evaluating the parameter list
    pub params_error: Option<String>,
    /// Call that touched a withheld builtin or module
    #[serde(default)]
    pub sandbox_error: Option<String>,
    /// One entry per parameter tuple, in declaration order
    pub outcomes: Vec<Observation>,
}

impl OracleReport {
    /// Find and decode the report line in harness stdout
    ///
    /// # Errors
    ///
    /// Returns an error if no report line is present or it is not valid JSON
    pub fn from_stdout(stdout: &str) -> crate::Result<Self> {
        let line = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(REPORT_MARKER))
            .ok_or_else(|| crate::Error::Oracle("harness produced no report".into()))?;
        Ok(serde_json::from_str(line)?)
    }
}

/// Observed behavior of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Call expression, `name(repr(arg), ...)`
    pub call: String,
    /// `repr` of each positional argument
    pub arguments: Vec<String>,
    /// What the call did
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Terminal outcome of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    /// Normal return
    Value {
        /// Raw string for `str` results, `repr` otherwise
        text: String,
        /// Whether the result was a `str`
        is_str: bool,
        /// Python type name of the result
        #[serde(rename = "type")]
        type_name: String,
    },
    /// Raised exception
    Error {
        /// Exception class name
        #[serde(rename = "type")]
        type_name: String,
        /// `str()` of the exception
        message: String,
        /// Raised object is not an `Exception` (e.g. `SystemExit`)
        #[serde(default)]
        base_exception: bool,
    },
    /// Normal return whose `repr` does not evaluate back to the value
    Opaque {
        /// Python type name of the result
        #[serde(rename = "type")]
        type_name: String,
    },
    /// Per-call limit exceeded
    Timeout,
}
