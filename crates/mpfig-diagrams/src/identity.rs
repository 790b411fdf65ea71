//! Diagram identity computation.
//!
//! Provides [`DiagramKey`] for computing the content hash that names both the
//! pipeline's intermediate files and the cached artifact.

use sha2::{Digest, Sha256};

use crate::options::DiagramFormat;

/// Diagram parameters for identity computation.
#[derive(Debug, Clone, Copy)]
pub struct DiagramKey<'a> {
    /// Diagram source exactly as written in the page.
    pub source: &'a str,
    /// Artifact filename prefix.
    pub prefix: &'a str,
}

impl DiagramKey<'_> {
    /// Compute the content hash of the diagram source.
    ///
    /// SHA-256 over the UTF-8 bytes of the source, hex-encoded. The source is
    /// not normalized: any byte difference, including whitespace, changes the
    /// hash.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Artifact filename: `{prefix}{hash}.{extension}`.
    #[must_use]
    pub fn filename(&self, format: DiagramFormat) -> String {
        format!(
            "{}{}.{}",
            self.prefix,
            self.compute_hash(),
            format.extension()
        )
    }
}
