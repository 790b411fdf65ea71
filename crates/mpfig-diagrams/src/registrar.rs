//! Artifact registration with the host site.

use crate::site::{Site, StaticFile};

/// Register `output_dir/filename` as a static file of `site`.
///
/// Must run once per rendered block, on cache hits as well as misses: the
/// site's manifest is rebuilt on every build, so a reused artifact still needs
/// to be announced.
pub fn register_artifact<S: Site + ?Sized>(site: &mut S, output_dir: &str, filename: &str) {
    let file = StaticFile::new(site.source_dir(), output_dir, filename);
    tracing::debug!(path = %file.relative_path().display(), "Registered diagram artifact");
    site.add_static_file(file);
}
