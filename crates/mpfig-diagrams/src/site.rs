//! Host site abstraction.
//!
//! Diagram rendering needs four things from the site it runs in: the source
//! directory, site-level option defaults, a publish-exclusion list and a
//! static-file manifest. [`Site`] captures those; [`StaticSite`] is the
//! in-memory implementation used by the site builder.

use std::path::{Path, PathBuf};

use mpfig_config::MetapostConfig;

/// A file under the site source that must be copied when publishing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaticFile {
    /// Site source directory.
    pub base: PathBuf,
    /// Directory relative to `base`.
    pub dir: String,
    /// Filename inside `dir`.
    pub name: String,
}

impl StaticFile {
    /// Create a static file record.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>, dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Absolute location in the site source.
    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.base.join(&self.dir).join(&self.name)
    }

    /// Location relative to the source (and destination) root.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.name)
    }
}

/// The site a diagram block is rendered for.
pub trait Site {
    /// Site source directory. Artifacts are written below it.
    fn source_dir(&self) -> &Path;

    /// URL prefix for artifact references, without trailing slash.
    fn base_url(&self) -> &str {
        ""
    }

    /// Site-wide defaults for block options.
    fn diagram_defaults(&self) -> Option<&MetapostConfig>;

    /// Source-relative paths skipped by the site's generic copy step.
    fn excludes(&self) -> &[String];

    /// Add a path to the exclusion list.
    fn exclude(&mut self, path: String);

    /// Register a file to be copied to the published site.
    fn add_static_file(&mut self, file: StaticFile);
}

/// In-memory [`Site`] holding the exclusion list and static-file manifest
/// for one build.
#[derive(Debug, Default)]
pub struct StaticSite {
    source_dir: PathBuf,
    base_url: String,
    defaults: Option<MetapostConfig>,
    excludes: Vec<String>,
    static_files: Vec<StaticFile>,
}

impl StaticSite {
    /// Create a site rooted at `source_dir`.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// Set the URL prefix for artifact references.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set site-wide option defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: MetapostConfig) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Seed the exclusion list.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Registered static files, in registration order.
    #[must_use]
    pub fn static_files(&self) -> &[StaticFile] {
        &self.static_files
    }

    /// Whether a source-relative path falls under an excluded entry.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.excludes
            .iter()
            .any(|entry| relative.starts_with(entry.trim_end_matches('/')))
    }
}

impl Site for StaticSite {
    fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn diagram_defaults(&self) -> Option<&MetapostConfig> {
        self.defaults.as_ref()
    }

    fn excludes(&self) -> &[String] {
        &self.excludes
    }

    fn exclude(&mut self, path: String) {
        self.excludes.push(path);
    }

    fn add_static_file(&mut self, file: StaticFile) {
        self.static_files.push(file);
    }
}
