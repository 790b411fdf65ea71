//! External toolchain pipeline.
//!
//! [`ToolchainPipeline`] compiles one [`RenderRequest`] into its artifact:
//!
//! 1. create a scoped workspace directory;
//! 2. write the MetaPost source and the TeX wrapper into it;
//! 3. run the [`Toolchain`] stages in order, the last one writing to a
//!    staging file next to the artifact;
//! 4. rename the staging file onto the artifact path.
//!
//! The rename is what makes the existence-only cache check sound: the
//! artifact path either does not exist or holds a complete file. Concurrent
//! renders of the same source each write their own staging file and the last
//! rename wins with identical content.
//!
//! The workspace and staging file are removed on every exit path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::{TempDir, TempPath};

use crate::consts::{ARTIFACT_MODE, WORKSPACE_PREFIX};
use crate::error::PipelineError;
use crate::request::RenderRequest;
use crate::stage::{Stage, StageOutput, run_stage};
use crate::toolchain::Toolchain;

/// Produces the artifact for a render request.
pub trait ArtifactPipeline: Send + Sync {
    /// Render `request` and place the result at `artifact`.
    ///
    /// On success `artifact` holds the complete output. On failure nothing is
    /// written to `artifact`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] describing the first failing step.
    fn run(&self, request: &RenderRequest, artifact: &Path) -> Result<(), PipelineError>;
}

/// [`ArtifactPipeline`] running the external MetaPost toolchain.
#[derive(Debug, Clone, Default)]
pub struct ToolchainPipeline {
    toolchain: Toolchain,
}

impl ToolchainPipeline {
    /// Create a pipeline for `toolchain`.
    #[must_use]
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    /// The configured toolchain.
    #[must_use]
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    fn create_workspace(&self) -> Result<TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        match self.toolchain.workspace_dir() {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(PipelineError::Workspace)
    }

    fn write_inputs(&self, workspace: &Path, request: &RenderRequest) -> Result<(), PipelineError> {
        let token = request.token();
        write_file(
            &workspace.join(Toolchain::source_name(token)),
            request.source(),
        )?;
        write_file(
            &workspace.join(Toolchain::wrapper_name(token)),
            &self.toolchain.wrapper_document(token),
        )
    }
}

impl ArtifactPipeline for ToolchainPipeline {
    fn run(&self, request: &RenderRequest, artifact: &Path) -> Result<(), PipelineError> {
        let start = Instant::now();
        let debug = request.options().debug;

        let workspace = self.create_workspace()?;
        self.write_inputs(workspace.path(), request)?;

        let staging = staging_path(artifact, &request.filename())?;
        let stages = self
            .toolchain
            .stages(request.token(), request.options().format, &staging);

        for stage in &stages {
            trace_command(debug, stage);
            let output = run_stage(stage, workspace.path(), self.toolchain.timeout())?;
            trace_output(debug, stage, &output);
        }

        set_artifact_permissions(&staging)?;
        staging
            .persist(artifact)
            .map_err(|e| PipelineError::Persist {
                path: artifact.to_path_buf(),
                source: e.error,
            })?;

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            tracing::warn!(
                workspace = %workspace_path.display(),
                error = %e,
                "Failed to remove diagram workspace"
            );
        }

        tracing::info!(
            artifact = %artifact.display(),
            stages = stages.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Rendered diagram"
        );
        Ok(())
    }
}

/// Reserve a uniquely named staging file in the artifact's directory.
///
/// The path is absolute because stages run with the workspace as their
/// working directory.
fn staging_path(artifact: &Path, filename: &str) -> Result<TempPath, PipelineError> {
    let dir = match artifact.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = std::path::absolute(dir).map_err(|source| PipelineError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    tempfile::Builder::new()
        .prefix(&format!(".{filename}."))
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map(tempfile::NamedTempFile::into_temp_path)
        .map_err(|source| PipelineError::Write {
            path: dir.join(format!(".{filename}.tmp")),
            source,
        })
}

/// Give the staged artifact ordinary file permissions.
///
/// Staging files are created owner-only and the mode survives the rename.
#[cfg(unix)]
fn set_artifact_permissions(path: &Path) -> Result<(), PipelineError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(ARTIFACT_MODE)).map_err(|source| {
        PipelineError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_artifact_permissions(_path: &Path) -> Result<(), PipelineError> {
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), PipelineError> {
    fs::write(path, contents).map_err(|source| PipelineError::Write {
        path: PathBuf::from(path),
        source,
    })
}

fn trace_command(debug: bool, stage: &Stage) {
    if debug {
        tracing::info!(stage = stage.name, command = %stage.command_line(), "Running");
    } else {
        tracing::debug!(stage = stage.name, command = %stage.command_line(), "Running");
    }
}

fn trace_output(debug: bool, stage: &Stage, output: &StageOutput) {
    if output.stdout.is_empty() && output.stderr.is_empty() {
        return;
    }
    if debug {
        tracing::info!(stage = stage.name, stdout = %output.stdout, stderr = %output.stderr, "Stage output");
    } else {
        tracing::trace!(stage = stage.name, stdout = %output.stdout, stderr = %output.stderr, "Stage output");
    }
}
