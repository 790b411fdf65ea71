//! Content-addressed MetaPost diagram rendering for static sites.
//!
//! This crate turns `{% diagramblock %}` blocks of MetaPost source into
//! cached image artifacts and figure markup:
//! - Options come from a fixed table of keys, layered over site defaults
//! - Artifacts are named by the SHA-256 of their source and reused when present
//! - Misses run the external toolchain (`mpost`, TeX, `dvipdfmx`, `pdfcrop`,
//!   `pdf2svg` or Ghostscript) in a scoped workspace
//! - Every artifact is registered with the site for publishing
//!
//! # Architecture
//!
//! - [`options`]: tag argument parsing and option resolution
//! - [`identity`]: content hash and artifact filename
//! - [`cache`]: existence-based cache policy
//! - [`toolchain`] / [`stage`] / [`pipeline`]: external process pipeline
//! - [`registrar`]: static-file registration
//! - [`markup`]: `<figure>` markup
//! - [`block`]: per-block orchestration
//! - [`template`]: block scanning in page text
//!
//! # Example
//!
//! ```no_run
//! use mpfig_diagrams::{DiagramBlock, StaticSite, Toolchain};
//!
//! let mut site = StaticSite::new("site");
//! let block = DiagramBlock::new(Toolchain::default());
//! let rendered = block
//!     .render(&mut site, r#"caption="A line""#, "beginfig(1); draw (0,0)--(1cm,1cm); endfig;")
//!     .unwrap();
//! println!("{}", rendered.html);
//! ```

pub mod block;
pub mod cache;
mod consts;
pub mod error;
pub mod identity;
pub mod markup;
pub mod options;
pub mod pipeline;
pub mod registrar;
pub mod request;
pub mod site;
pub mod stage;
pub mod template;
pub mod toolchain;

pub use block::{DiagramBlock, Rendered};
pub use cache::{CacheDecision, should_render};
pub use consts::{BASE_CLASS, TAG_NAME};
pub use error::{PipelineError, RenderError};
pub use identity::DiagramKey;
pub use markup::{ArtifactContent, artifact_url, compose, strip_xml_prologue};
pub use options::{
    ArgumentWarning, DiagramFormat, OptionSet, Resolved, TagArgs, resolve_for_site,
};
pub use pipeline::{ArtifactPipeline, ToolchainPipeline};
pub use registrar::register_artifact;
pub use request::RenderRequest;
pub use site::{Site, StaticFile, StaticSite};
pub use stage::Stage;
pub use template::{Expanded, TemplateWarning, expand_blocks};
pub use toolchain::Toolchain;
