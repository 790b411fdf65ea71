//! Render cache policy.
//!
//! Artifacts are content-addressed, so the artifact directory is the cache:
//! a file at the expected path is trusted without inspection. This relies on
//! the pipeline only ever placing complete files there (see
//! [`ToolchainPipeline`](crate::ToolchainPipeline)).

use std::path::Path;

use crate::options::OptionSet;

/// Outcome of the cache check for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Artifact exists and `increment` is on: reuse it.
    Hit,
    /// Artifact missing: render it.
    Miss,
    /// `increment` is off: render regardless of what exists.
    Forced,
}

impl CacheDecision {
    /// Decide whether the artifact at `artifact` can be reused.
    #[must_use]
    pub fn evaluate(options: &OptionSet, artifact: &Path) -> Self {
        if !options.increment {
            Self::Forced
        } else if artifact.is_file() {
            Self::Hit
        } else {
            Self::Miss
        }
    }

    /// Whether the pipeline has to run.
    #[must_use]
    pub fn should_render(self) -> bool {
        !matches!(self, Self::Hit)
    }

    /// Short label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache_hit",
            Self::Miss => "cache_miss",
            Self::Forced => "forced",
        }
    }
}

/// Whether the artifact at `artifact` must be (re)generated.
#[must_use]
pub fn should_render(options: &OptionSet, artifact: &Path) -> bool {
    CacheDecision::evaluate(options, artifact).should_render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(increment: bool) -> OptionSet {
        OptionSet {
            increment,
            ..OptionSet::default()
        }
    }

    #[test]
    fn test_missing_artifact_is_miss() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.svg");
        assert_eq!(CacheDecision::evaluate(&options(true), &path), CacheDecision::Miss);
        assert!(should_render(&options(true), &path));
    }

    #[test]
    fn test_existing_artifact_is_hit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.svg");
        std::fs::write(&path, "<svg/>").unwrap();
        assert_eq!(CacheDecision::evaluate(&options(true), &path), CacheDecision::Hit);
        assert!(!should_render(&options(true), &path));
    }

    #[test]
    fn test_existing_artifact_content_not_inspected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.svg");
        std::fs::write(&path, "").unwrap();
        assert!(!should_render(&options(true), &path));
    }

    #[test]
    fn test_increment_off_forces_render() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.svg");
        std::fs::write(&path, "<svg/>").unwrap();
        assert_eq!(
            CacheDecision::evaluate(&options(false), &path),
            CacheDecision::Forced
        );
        assert!(should_render(&options(false), &path));
    }

    #[test]
    fn test_directory_at_path_is_not_hit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.svg");
        std::fs::create_dir(&path).unwrap();
        assert!(should_render(&options(true), &path));
    }
}
