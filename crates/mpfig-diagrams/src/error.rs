//! Error types for diagram rendering.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Failure of the external toolchain pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The temporary workspace could not be created.
    #[error("failed to create workspace: {0}")]
    Workspace(#[source] io::Error),

    /// An input or staging file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stage's program is not installed or not on `PATH`.
    #[error("{stage}: program '{program}' not found: {source}")]
    ToolNotFound {
        stage: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },

    /// The stage's process could not be started.
    #[error("{stage}: failed to start `{command}`: {source}")]
    Spawn {
        stage: &'static str,
        command: String,
        #[source]
        source: io::Error,
    },

    /// Waiting for the stage's process failed.
    #[error("{stage}: failed to wait for `{command}`: {source}")]
    Wait {
        stage: &'static str,
        command: String,
        #[source]
        source: io::Error,
    },

    /// The stage exited unsuccessfully.
    #[error("{stage}: `{command}` failed (exit {}):\n{}", exit_code_label(.exit_code.as_ref()), diagnostics(.stderr, .stdout))]
    StageFailed {
        stage: &'static str,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    /// The stage ran longer than the configured timeout and was killed.
    #[error("{stage}: `{command}` timed out after {timeout:?}")]
    Timeout {
        stage: &'static str,
        command: String,
        timeout: Duration,
    },

    /// The finished artifact could not be moved into place.
    #[error("failed to move artifact into {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn exit_code_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), ToString::to_string)
}

/// Prefer stderr; TeX-family tools report errors on stdout.
fn diagnostics<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    if stderr.trim().is_empty() {
        stdout.trim_end()
    } else {
        stderr.trim_end()
    }
}

/// Failure of a diagram block render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The external pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A filesystem operation outside the pipeline failed.
    #[error("{action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
