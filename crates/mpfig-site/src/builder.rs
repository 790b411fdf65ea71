//! Site build: page expansion and publishing.

use std::fs;
use std::path::Path;
use std::time::Instant;

use mpfig_config::{CONFIG_FILENAME, Config};
use mpfig_diagrams::{CacheDecision, DiagramBlock, RenderError, Site, Toolchain, expand_blocks};

use crate::error::SiteError;
use crate::scanner::{EntryKind, Scanner};
use crate::site::{FsSite, copy_file};

/// Counters for one build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages expanded.
    pub pages: usize,
    /// Diagram blocks found.
    pub blocks: usize,
    /// Blocks whose artifact was rendered.
    pub rendered: usize,
    /// Blocks whose artifact was reused.
    pub reused: usize,
    /// Non-fatal argument and markup warnings.
    pub warnings: usize,
    /// Files copied by the generic copy step.
    pub copied: usize,
    /// Registered static files published.
    pub published: usize,
}

/// Builds a site: expands diagram blocks in pages and publishes the result.
#[derive(Debug)]
pub struct SiteBuilder {
    site: FsSite,
    block: DiagramBlock,
}

impl SiteBuilder {
    /// Create a builder running the configured toolchain.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_block(
            config,
            DiagramBlock::new(Toolchain::new(config.toolchain.clone())),
        )
    }

    /// Create a builder with a custom block renderer.
    #[must_use]
    pub fn with_block(config: &Config, block: DiagramBlock) -> Self {
        Self {
            site: FsSite::from_config(config),
            block,
        }
    }

    /// The site being built.
    #[must_use]
    pub fn site(&self) -> &FsSite {
        &self.site
    }

    /// Expand the diagram blocks of a single page.
    ///
    /// Artifacts are rendered and registered but nothing is published.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the page cannot be read or a block fails.
    pub fn render_page(&mut self, page: &Path) -> Result<String, SiteError> {
        let text = fs::read_to_string(page).map_err(SiteError::io(page))?;
        self.expand_page(page, &text, &mut BuildReport::default())
    }

    /// Build the whole site into the destination directory.
    ///
    /// 1. expand every page and write it to the destination;
    /// 2. copy other files, skipping excluded paths (including every
    ///    diagram output directory);
    /// 3. publish the registered diagram artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] on the first failing file or diagram block.
    pub fn build(&mut self) -> Result<BuildReport, SiteError> {
        let start = Instant::now();
        let source_dir = self.site.source_dir().to_path_buf();
        let destination = self.site.destination().to_path_buf();
        let mut report = BuildReport::default();

        let entries = Scanner::new(source_dir.clone()).skip(&destination).scan();
        fs::create_dir_all(&destination).map_err(SiteError::io(&destination))?;

        for entry in entries.iter().filter(|e| e.kind == EntryKind::Page) {
            let text = fs::read_to_string(&entry.path).map_err(SiteError::io(&entry.path))?;
            let html = self.expand_page(&entry.path, &text, &mut report)?;
            let target = destination.join(&entry.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(SiteError::io(parent))?;
            }
            fs::write(&target, html).map_err(SiteError::io(&target))?;
            report.pages += 1;
        }

        // Output directories are only known after the pages are expanded
        for entry in entries.iter().filter(|e| e.kind == EntryKind::Asset) {
            if entry.relative == Path::new(CONFIG_FILENAME) || self.site.is_excluded(&entry.relative)
            {
                continue;
            }
            copy_file(&entry.path, &destination.join(&entry.relative))?;
            report.copied += 1;
        }

        report.published = self.site.publish_static_files()?;

        tracing::info!(
            source = %source_dir.display(),
            destination = %destination.display(),
            pages = report.pages,
            blocks = report.blocks,
            rendered = report.rendered,
            reused = report.reused,
            elapsed_ms = start.elapsed().as_millis(),
            "Site built"
        );
        Ok(report)
    }

    fn expand_page(
        &mut self,
        page: &Path,
        text: &str,
        report: &mut BuildReport,
    ) -> Result<String, SiteError> {
        let site = &mut self.site;
        let block = &self.block;

        let expanded = expand_blocks(text, |args, body| -> Result<String, RenderError> {
            let rendered = block.render(&mut *site, args, body)?;
            for warning in &rendered.warnings {
                tracing::warn!(page = %page.display(), "{warning}");
            }
            report.warnings += rendered.warnings.len();
            match rendered.cache {
                CacheDecision::Hit => report.reused += 1,
                CacheDecision::Miss | CacheDecision::Forced => report.rendered += 1,
            }
            Ok(rendered.html)
        })
        .map_err(|source| SiteError::Render {
            page: page.to_path_buf(),
            source,
        })?;

        for warning in &expanded.warnings {
            tracing::warn!(page = %page.display(), "{warning}");
        }
        report.warnings += expanded.warnings.len();
        report.blocks += expanded.blocks;

        Ok(expanded.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpfig_config::MetapostConfig;
    use mpfig_diagrams::{ArtifactPipeline, PipelineError, RenderRequest};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingPipeline {
        runs: AtomicUsize,
    }

    impl ArtifactPipeline for CountingPipeline {
        fn run(&self, request: &RenderRequest, artifact: &Path) -> Result<(), PipelineError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            fs::write(artifact, format!("<svg id=\"{}\"/>", request.token())).map_err(|source| {
                PipelineError::Write {
                    path: artifact.to_path_buf(),
                    source,
                }
            })
        }
    }

    struct BrokenPipeline;

    impl ArtifactPipeline for BrokenPipeline {
        fn run(&self, _request: &RenderRequest, _artifact: &Path) -> Result<(), PipelineError> {
            Err(PipelineError::StageFailed {
                stage: "mpost",
                command: "upmpost -interaction=nonstopmode x.mp".to_owned(),
                exit_code: Some(1),
                stderr: "! Missing `;' has been inserted.".to_owned(),
                stdout: String::new(),
            })
        }
    }

    const PAGE: &str = "# Figures\n\n{% diagramblock caption=\"Line\" %}\nbeginfig(1); draw (0,0)--(1cm,0); endfig;\n{% enddiagramblock %}\n";

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config(src: &Path) -> Config {
        let mut config = Config::default();
        config.site_resolved.source_dir = src.to_path_buf();
        config.site_resolved.destination = src.join("_site");
        config
    }

    fn builder(config: &Config) -> (SiteBuilder, Arc<CountingPipeline>) {
        let pipeline = Arc::new(CountingPipeline::default());
        let block = DiagramBlock::with_pipeline(Arc::<CountingPipeline>::clone(&pipeline));
        (SiteBuilder::with_block(config, block), pipeline)
    }

    #[test]
    fn test_build_expands_and_publishes() {
        let src = TempDir::new().unwrap();
        write(src.path(), "index.md", PAGE);
        write(src.path(), "css/site.css", "body {}");
        write(src.path(), CONFIG_FILENAME, "");
        let config = config(src.path());
        let (mut builder, pipeline) = builder(&config);

        let report = builder.build().unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.blocks, 1);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.copied, 1);
        assert_eq!(report.published, 1);
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 1);

        let dest = src.path().join("_site");
        let page = fs::read_to_string(dest.join("index.md")).unwrap();
        assert!(page.starts_with("# Figures\n\n<figure class=\"metapost\">"));
        assert!(page.contains("<figcaption>Line</figcaption></figure>\n"));
        assert!(!page.contains("diagramblock"));
        assert!(dest.join("css/site.css").is_file());
        assert!(!dest.join(CONFIG_FILENAME).exists());

        let file = &builder.site().static_files()[0];
        assert!(dest.join(file.relative_path()).is_file());
    }

    #[test]
    fn test_rebuild_reuses_artifacts() {
        let src = TempDir::new().unwrap();
        write(src.path(), "a.md", PAGE);
        write(src.path(), "b.md", PAGE);
        let config = config(src.path());

        let (mut first, pipeline) = builder(&config);
        let report = first.build().unwrap();
        assert_eq!((report.rendered, report.reused), (1, 1));
        assert_eq!(report.published, 1);

        let block = DiagramBlock::with_pipeline(Arc::<CountingPipeline>::clone(&pipeline));
        let report = SiteBuilder::with_block(&config, block).build().unwrap();
        assert_eq!((report.rendered, report.reused), (0, 2));
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_output_dir_not_copied_generically() {
        let src = TempDir::new().unwrap();
        write(src.path(), "index.md", PAGE);
        write(src.path(), "figs/stale.svg", "<svg/>");
        let mut config = config(src.path());
        config.metapost = Some(MetapostConfig {
            output_dir: Some("figs".to_owned()),
            ..MetapostConfig::default()
        });
        let (mut builder, _) = builder(&config);

        let report = builder.build().unwrap();

        let dest = src.path().join("_site");
        // Only the registered artifact is published from the output directory
        assert!(!dest.join("figs/stale.svg").exists());
        assert_eq!(report.copied, 0);
        assert_eq!(report.published, 1);
        assert_eq!(
            fs::read_dir(dest.join("figs")).unwrap().count(),
            1,
            "only the rendered artifact"
        );
    }

    #[test]
    fn test_configured_excludes_respected() {
        let src = TempDir::new().unwrap();
        write(src.path(), "drafts/notes.txt", "wip");
        write(src.path(), "keep.txt", "ok");
        let mut config = config(src.path());
        config.site_resolved.exclude = vec!["drafts".to_owned()];
        let (mut builder, _) = builder(&config);

        builder.build().unwrap();

        let dest = src.path().join("_site");
        assert!(dest.join("keep.txt").is_file());
        assert!(!dest.join("drafts").exists());
    }

    #[test]
    fn test_failing_block_aborts_build() {
        let src = TempDir::new().unwrap();
        write(src.path(), "index.md", PAGE);
        let config = config(src.path());
        let block = DiagramBlock::with_pipeline(Arc::new(BrokenPipeline));
        let mut builder = SiteBuilder::with_block(&config, block);

        let err = builder.build().unwrap_err();

        match &err {
            SiteError::Render { page, source } => {
                assert_eq!(page, &src.path().join("index.md"));
                assert!(matches!(source, RenderError::Pipeline(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("upmpost -interaction=nonstopmode x.mp"));
        assert!(message.contains("Missing"));
        assert!(builder.site().static_files().is_empty());
    }

    #[test]
    fn test_render_page_counts_warnings_without_publishing() {
        let src = TempDir::new().unwrap();
        write(
            src.path(),
            "page.html",
            "{% diagramblock bogus=1 %}beginfig(1); endfig;{% enddiagramblock %}\n{% diagramblock %}",
        );
        let config = config(src.path());
        let (mut builder, _) = builder(&config);

        let html = builder.render_page(&src.path().join("page.html")).unwrap();

        assert!(html.starts_with("<figure class=\"metapost\">"));
        assert!(html.ends_with("\n{% diagramblock %}"));
        assert_eq!(builder.site().static_files().len(), 1);
        assert!(!src.path().join("_site").exists());
    }

    #[test]
    fn test_render_page_missing_file() {
        let src = TempDir::new().unwrap();
        let config = config(src.path());
        let (mut builder, _) = builder(&config);

        let err = builder
            .render_page(&PathBuf::from("/nonexistent/page.md"))
            .unwrap_err();
        assert!(matches!(err, SiteError::Io { .. }));
    }
}
