//! Site build errors.

use std::io;
use std::path::PathBuf;

use mpfig_diagrams::RenderError;

/// Failure of a site build.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Reading, writing or copying a file failed.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A diagram block in a page failed to render.
    #[error("failed to render diagram in {}: {source}", .page.display())]
    Render {
        page: PathBuf,
        #[source]
        source: RenderError,
    },
}

impl SiteError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
