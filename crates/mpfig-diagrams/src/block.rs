//! Diagram block rendering.
//!
//! [`DiagramBlock::render`] is the entry point the host calls once per
//! `{% diagramblock %}` occurrence. It ties the components together:
//!
//! ```text
//! resolve options -> identity -> cache check --hit--> register -> markup
//!                                    |                   ^
//!                                    +--miss-> pipeline -+
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::CacheDecision;
use crate::error::RenderError;
use crate::markup::{ArtifactContent, artifact_url, compose};
use crate::options::{ArgumentWarning, DiagramFormat, TagArgs, resolve_for_site};
use crate::pipeline::{ArtifactPipeline, ToolchainPipeline};
use crate::registrar::register_artifact;
use crate::request::RenderRequest;
use crate::site::Site;
use crate::toolchain::Toolchain;

/// Result of rendering one block.
#[derive(Debug)]
pub struct Rendered {
    /// Markup replacing the block.
    pub html: String,
    /// Non-fatal problems with the block's arguments.
    pub warnings: Vec<ArgumentWarning>,
    /// Whether the artifact was reused or rendered.
    pub cache: CacheDecision,
    /// Artifact location on disk.
    pub artifact: PathBuf,
}

/// Renders diagram blocks through an [`ArtifactPipeline`].
#[derive(Clone)]
pub struct DiagramBlock {
    pipeline: Arc<dyn ArtifactPipeline>,
}

impl DiagramBlock {
    /// Create a renderer running the external `toolchain`.
    #[must_use]
    pub fn new(toolchain: Toolchain) -> Self {
        Self::with_pipeline(Arc::new(ToolchainPipeline::new(toolchain)))
    }

    /// Create a renderer with a custom pipeline.
    #[must_use]
    pub fn with_pipeline(pipeline: Arc<dyn ArtifactPipeline>) -> Self {
        Self { pipeline }
    }

    /// Render one block.
    ///
    /// `args` is the raw tag argument string and `source` the block body,
    /// used verbatim as MetaPost source.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the output directory cannot be created,
    /// the pipeline fails or an inline artifact cannot be read. Nothing is
    /// registered with `site` in that case.
    pub fn render<S: Site + ?Sized>(
        &self,
        site: &mut S,
        args: &str,
        source: &str,
    ) -> Result<Rendered, RenderError> {
        let args = TagArgs::parse(args);
        let resolved = resolve_for_site(site, &args);
        for warning in &resolved.warnings {
            tracing::warn!("{warning}");
        }

        let request = RenderRequest::new(source, resolved.options);
        let options = request.options();
        let filename = request.filename();
        let output_dir = site.source_dir().join(&options.output_dir);
        let artifact = output_dir.join(&filename);

        let cache = CacheDecision::evaluate(options, &artifact);
        tracing::debug!(artifact = %artifact.display(), cache = cache.as_str(), "Diagram cache check");

        if cache.should_render() {
            fs::create_dir_all(&output_dir).map_err(|source| RenderError::Filesystem {
                action: "failed to create",
                path: output_dir.clone(),
                source,
            })?;
            self.pipeline.run(&request, &artifact)?;
        }

        register_artifact(site, &options.output_dir, &filename);

        let content = if options.inline && options.format == DiagramFormat::Svg {
            let svg = fs::read_to_string(&artifact).map_err(|source| RenderError::Filesystem {
                action: "failed to read",
                path: artifact.clone(),
                source,
            })?;
            ArtifactContent::InlineSvg(svg)
        } else {
            ArtifactContent::Link(artifact_url(site.base_url(), &options.output_dir, &filename))
        };

        Ok(Rendered {
            html: compose(&content, options),
            warnings: resolved.warnings,
            cache,
            artifact,
        })
    }
}

impl std::fmt::Debug for DiagramBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramBlock").finish_non_exhaustive()
    }
}
