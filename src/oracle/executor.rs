//! Code execution backends
//!
//! Provides the [`Executor`] seam used by the oracle synthesizer together with
//! the process plumbing shared by executors: concurrent pipe draining and a
//! wall-clock bound on the child process.

use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Output};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{Error, Language, Result};

use super::ExecutionResult;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Code executor trait for running programs
pub trait Executor: Send + Sync {
    /// Execute code with the given stdin input
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the process outlives `timeout_ms`, or an
    /// error if the process cannot be started
    fn execute(&self, code: &str, input: &str, timeout_ms: u64) -> Result<ExecutionResult>;

    /// Get the language this executor handles
    fn language(&self) -> Language;
}

fn drain<R: Read + Send + 'static>(handle: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = handle {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn join_output(
    stdout: JoinHandle<Vec<u8>>,
    stderr: JoinHandle<Vec<u8>>,
) -> (Vec<u8>, Vec<u8>) {
    (
        stdout.join().unwrap_or_default(),
        stderr.join().unwrap_or_default(),
    )
}

/// Wait for a process, killing it once `timeout` has elapsed
///
/// Stdout and stderr are drained on their own threads so a chatty child
/// cannot block on a full pipe.
pub(crate) fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output> {
    let stdout_thread = drain::<ChildStdout>(child.stdout.take());
    let stderr_thread = drain::<ChildStderr>(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_output(stdout_thread, stderr_thread);
                return Err(Error::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_output(stdout_thread, stderr_thread);
                return Err(Error::Oracle(format!("wait error: {e}")));
            }
        }
    };

    let (stdout, stderr) = join_output(stdout_thread, stderr_thread);
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}
