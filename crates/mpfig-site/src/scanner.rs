//! Source file discovery by filesystem walking.
//!
//! The Scanner only classifies files; nothing is read at this stage.

use std::fs;
use std::path::{Path, PathBuf};

/// Page extensions whose text is scanned for diagram blocks.
const PAGE_EXTENSIONS: &[&str] = &["md", "markdown", "html", "htm"];

/// Kind of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    /// Text page expanded before publishing.
    Page,
    /// Any other file, copied as is.
    Asset,
}

/// Reference to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceEntry {
    /// Path relative to the source directory.
    pub relative: PathBuf,
    /// Full path.
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Discovers source files below a site source directory.
///
/// Skips hidden entries (`.name`), underscore entries (`_name`, e.g. the
/// default `_site` destination) and any directory listed in `skip`.
pub(crate) struct Scanner {
    source_dir: PathBuf,
    skip: Vec<PathBuf>,
}

impl Scanner {
    pub fn new(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            skip: Vec::new(),
        }
    }

    /// Never descend into `dir`.
    pub fn skip(mut self, dir: &Path) -> Self {
        self.skip.push(normalize(dir));
        self
    }

    /// Scan the source directory, sorted by relative path.
    ///
    /// Returns an empty Vec if the source directory doesn't exist.
    pub fn scan(&self) -> Vec<SourceEntry> {
        let mut entries = Vec::new();
        if self.source_dir.is_dir() {
            self.scan_directory(&self.source_dir, Path::new(""), &mut entries);
        }
        entries.sort_by(|a, b| a.relative.cmp(&b.relative));
        entries
    }

    fn scan_directory(&self, dir: &Path, prefix: &Path, out: &mut Vec<SourceEntry>) {
        let Ok(read_dir) = fs::read_dir(dir) else {
            tracing::warn!(dir = %dir.display(), "Failed to read directory");
            return;
        };

        for entry in read_dir.filter_map(Result::ok) {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with('.') || name_str.starts_with('_') {
                continue;
            }

            let path = entry.path();
            let relative = prefix.join(&name);
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

            if is_dir {
                if self.skip.contains(&normalize(&path)) {
                    continue;
                }
                self.scan_directory(&path, &relative, out);
            } else {
                let kind = if is_page(&path) {
                    EntryKind::Page
                } else {
                    EntryKind::Asset
                };
                out.push(SourceEntry {
                    relative,
                    path,
                    kind,
                });
            }
        }
    }
}

fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relatives(entries: &[SourceEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.relative.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_scan_classifies_entries() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "index.md");
        touch(tmp.path(), "about.HTML");
        touch(tmp.path(), "css/site.css");
        touch(tmp.path(), "posts/first.markdown");

        let entries = Scanner::new(tmp.path().to_path_buf()).scan();

        assert_eq!(
            relatives(&entries),
            ["about.HTML", "css/site.css", "index.md", "posts/first.markdown"]
        );
        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EntryKind::Page,
                EntryKind::Asset,
                EntryKind::Page,
                EntryKind::Page
            ]
        );
    }

    #[test]
    fn test_scan_skips_hidden_underscore_and_destination() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "index.md");
        touch(tmp.path(), ".git/config");
        touch(tmp.path(), "_site/index.html");
        touch(tmp.path(), "public/index.html");

        let entries = Scanner::new(tmp.path().to_path_buf())
            .skip(&tmp.path().join("public"))
            .scan();

        assert_eq!(relatives(&entries), ["index.md"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let entries = Scanner::new(tmp.path().join("missing")).scan();
        assert!(entries.is_empty());
    }
}
