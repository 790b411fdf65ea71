//! Per-block render request.

use std::path::PathBuf;

use crate::identity::DiagramKey;
use crate::options::OptionSet;

/// Everything needed to render one diagram block.
///
/// Built once per block and only borrowed afterwards by the cache check, the
/// pipeline and the markup composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    source: String,
    options: OptionSet,
    token: String,
}

impl RenderRequest {
    /// Create a request, deriving the identity token from `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, options: OptionSet) -> Self {
        let source = source.into();
        let token = DiagramKey {
            source: &source,
            prefix: &options.prefix,
        }
        .compute_hash();
        Self {
            source,
            options,
            token,
        }
    }

    /// Diagram source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolved options.
    #[must_use]
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Content hash; base name of every intermediate file.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Artifact filename: `{prefix}{token}.{ext}`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "{}{}.{}",
            self.options.prefix,
            self.token,
            self.options.format.extension()
        )
    }

    /// Artifact location relative to the site source.
    #[must_use]
    pub fn relative_artifact(&self) -> PathBuf {
        PathBuf::from(&self.options.output_dir).join(self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DiagramFormat;

    #[test]
    fn test_filename_matches_identity() {
        let options = OptionSet {
            prefix: "fig-".to_owned(),
            ..OptionSet::default()
        };
        let request = RenderRequest::new("beginfig(1); endfig;", options);
        let key = DiagramKey {
            source: "beginfig(1); endfig;",
            prefix: "fig-",
        };

        assert_eq!(request.token(), key.compute_hash());
        assert_eq!(request.filename(), key.filename(DiagramFormat::Svg));
    }

    #[test]
    fn test_relative_artifact() {
        let options = OptionSet {
            format: DiagramFormat::Png,
            ..OptionSet::default()
        };
        let request = RenderRequest::new("x", options);
        assert_eq!(
            request.relative_artifact(),
            PathBuf::from(format!("images/metapost/{}.png", request.token()))
        );
    }
}
