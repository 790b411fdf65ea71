//! Filesystem static-site build with MetaPost diagram blocks.
//!
//! This crate provides:
//! - [`FsSite`]: the host site diagram blocks register artifacts with
//! - [`SiteBuilder`]: expands `{% diagramblock %}` blocks in every page and
//!   publishes pages, plain files and registered artifacts
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mpfig_config::Config;
//! use mpfig_site::SiteBuilder;
//!
//! let config = Config::load(None, None)?;
//! let report = SiteBuilder::new(&config).build()?;
//! println!("{} pages, {} diagrams", report.pages, report.blocks);
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod scanner;
mod site;

pub use builder::{BuildReport, SiteBuilder};
pub use error::SiteError;
pub use site::FsSite;
