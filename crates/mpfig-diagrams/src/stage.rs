//! Single external-process pipeline stages.
//!
//! A [`Stage`] is one program invocation. [`run_stage`] executes it in the
//! workspace with stdin closed, captures stdout and stderr completely, and
//! waits for exit, optionally bounded by a timeout after which the process is
//! killed.

use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::consts::POLL_INTERVAL;
use crate::error::PipelineError;

/// One external program invocation of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Short stage name used in logs and errors (e.g. `"mpost"`).
    pub name: &'static str,
    /// Program to run.
    pub program: String,
    /// Program arguments.
    pub args: Vec<OsString>,
}

impl Stage {
    pub(crate) fn new<I, A>(name: &'static str, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            name,
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Command line for logs and error messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured output of a successful stage.
#[derive(Debug, Default)]
pub(crate) struct StageOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `stage` with `cwd` as working directory.
///
/// Returns the captured output on a zero exit status. Any other outcome is an
/// error; on timeout the child is killed and reaped before returning.
pub(crate) fn run_stage(
    stage: &Stage,
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<StageOutput, PipelineError> {
    let mut child = Command::new(&stage.program)
        .args(&stage.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                PipelineError::ToolNotFound {
                    stage: stage.name,
                    program: stage.program.clone(),
                    source,
                }
            } else {
                PipelineError::Spawn {
                    stage: stage.name,
                    command: stage.command_line(),
                    source,
                }
            }
        })?;

    // Drain both pipes concurrently so a chatty tool cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // Descendants may still hold the pipes open; the drain threads are detached
            drop((stdout, stderr));
            return Err(PipelineError::Timeout {
                stage: stage.name,
                command: stage.command_line(),
                timeout: timeout.unwrap_or_default(),
            });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PipelineError::Wait {
                stage: stage.name,
                command: stage.command_line(),
                source,
            });
        }
    };

    let output = StageOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
    };

    if !status.success() {
        return Err(PipelineError::StageFailed {
            stage: stage.name,
            command: stage.command_line(),
            exit_code: status.code(),
            stderr: output.stderr,
            stdout: output.stdout,
        });
    }

    Ok(output)
}

/// Wait for `child`, giving up after `timeout`.
///
/// Returns `Ok(None)` when the deadline passes with the child still running.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Read a child pipe to the end on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
