//! Filesystem-backed host site.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use mpfig_config::{Config, MetapostConfig};
use mpfig_diagrams::{Site, StaticFile, StaticSite};

use crate::error::SiteError;

/// A site read from a source directory and published to a destination.
///
/// Holds the exclusion list and the static-file manifest diagram blocks
/// register their artifacts with, and copies those files on publish.
#[derive(Debug)]
pub struct FsSite {
    inner: StaticSite,
    destination: PathBuf,
}

impl FsSite {
    /// Create a site with no defaults or exclusions.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            inner: StaticSite::new(source_dir),
            destination: destination.into(),
        }
    }

    /// Create a site from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let site = &config.site_resolved;
        let mut inner = StaticSite::new(&site.source_dir)
            .with_base_url(&site.base_url)
            .with_excludes(site.exclude.clone());
        if let Some(defaults) = &config.metapost {
            inner = inner.with_defaults(defaults.clone());
        }
        Self {
            inner,
            destination: site.destination.clone(),
        }
    }

    /// Publish destination directory.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Registered static files, in registration order (may repeat).
    #[must_use]
    pub fn static_files(&self) -> &[StaticFile] {
        self.inner.static_files()
    }

    /// Whether a source-relative path is excluded from the generic copy.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.inner.is_excluded(relative)
    }

    /// Copy every registered static file to the destination.
    ///
    /// Files registered more than once are copied once. Returns the number
    /// of files copied.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Io`] if a file cannot be copied.
    pub fn publish_static_files(&self) -> Result<usize, SiteError> {
        let unique: BTreeSet<&StaticFile> = self.static_files().iter().collect();
        for file in &unique {
            let target = self.destination.join(file.relative_path());
            copy_file(&file.source_path(), &target)?;
        }
        tracing::debug!(count = unique.len(), "Published static files");
        Ok(unique.len())
    }
}

impl Site for FsSite {
    fn source_dir(&self) -> &Path {
        self.inner.source_dir()
    }

    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    fn diagram_defaults(&self) -> Option<&MetapostConfig> {
        self.inner.diagram_defaults()
    }

    fn excludes(&self) -> &[String] {
        self.inner.excludes()
    }

    fn exclude(&mut self, path: String) {
        self.inner.exclude(path);
    }

    fn add_static_file(&mut self, file: StaticFile) {
        self.inner.add_static_file(file);
    }
}

/// Copy `from` to `to`, creating parent directories.
pub(crate) fn copy_file(from: &Path, to: &Path) -> Result<(), SiteError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(SiteError::io(parent))?;
    }
    fs::copy(from, to).map_err(SiteError::io(from))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_publish_deduplicates() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("images/metapost")).unwrap();
        fs::write(src.path().join("images/metapost/a.svg"), "<svg/>").unwrap();

        let mut site = FsSite::new(src.path(), dest.path());
        let file = StaticFile::new(src.path(), "images/metapost", "a.svg");
        site.add_static_file(file.clone());
        site.add_static_file(file);

        assert_eq!(site.publish_static_files().unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dest.path().join("images/metapost/a.svg")).unwrap(),
            "<svg/>"
        );
    }

    #[test]
    fn test_publish_missing_file_fails() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let mut site = FsSite::new(src.path(), dest.path());
        site.add_static_file(StaticFile::new(src.path(), "images", "gone.svg"));

        let err = site.publish_static_files().unwrap_err();
        assert!(matches!(err, SiteError::Io { .. }));
        assert!(err.to_string().contains("gone.svg"));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.site_resolved.source_dir = PathBuf::from("/src");
        config.site_resolved.destination = PathBuf::from("/out");
        config.site_resolved.base_url = "/docs".to_owned();
        config.site_resolved.exclude = vec!["drafts".to_owned()];
        config.metapost = Some(MetapostConfig {
            class: Some("wide".to_owned()),
            ..MetapostConfig::default()
        });

        let site = FsSite::from_config(&config);

        assert_eq!(site.source_dir(), Path::new("/src"));
        assert_eq!(site.destination(), Path::new("/out"));
        assert_eq!(site.base_url(), "/docs");
        assert!(site.is_excluded(Path::new("drafts/a.md")));
        assert_eq!(
            site.diagram_defaults().and_then(|d| d.class.as_deref()),
            Some("wide")
        );
    }
}
