//! `mpfig build` command implementation.

use std::path::PathBuf;

use clap::Args;
use mpfig_config::{CliSettings, Config};
use mpfig_site::SiteBuilder;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Site source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Publish directory (overrides config).
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Regenerate every diagram even if its artifact exists.
    #[arg(short, long)]
    force: bool,

    /// Path to configuration file (default: auto-discover mpfig.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            destination: self.destination,
            increment: self.force.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");

        output.info(&format!(
            "Source: {}",
            config.site_resolved.source_dir.display()
        ));
        output.info(&format!(
            "Destination: {}",
            config.site_resolved.destination.display()
        ));

        let report = SiteBuilder::new(&config).build()?;

        if report.warnings > 0 {
            output.warning(&format!("{} warning(s), see log", report.warnings));
        }
        output.success(&format!(
            "Built {} page(s): {} diagram(s), {} rendered, {} reused",
            report.pages, report.blocks, report.rendered, report.reused
        ));
        Ok(())
    }
}
