//! `mpfig render` command implementation.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use mpfig_config::{CliSettings, Config};
use mpfig_site::SiteBuilder;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Page whose diagram blocks are expanded.
    file: PathBuf,

    /// Write the expanded page here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Site source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Regenerate every diagram even if its artifact exists.
    #[arg(short, long)]
    force: bool,

    /// Path to configuration file (default: auto-discover mpfig.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            increment: self.force.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");

        let mut builder = SiteBuilder::new(&config);
        let html = builder.render_page(&self.file)?;

        match self.output {
            Some(path) => {
                fs::write(&path, html)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => std::io::stdout().write_all(html.as_bytes())?,
        }

        let artifacts = builder.site().static_files().len();
        output.info(&format!("{artifacts} diagram artifact(s) registered"));
        Ok(())
    }
}
