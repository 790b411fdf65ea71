//! mpfig CLI - MetaPost figures for static sites.
//!
//! Provides commands for:
//! - `build`: Expand diagram blocks in every page and publish the site
//! - `render`: Expand the diagram blocks of a single page

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, RenderArgs};
use output::Output;

/// mpfig - MetaPost figures for static sites.
#[derive(Parser)]
#[command(name = "mpfig", version, about)]
struct Cli {
    /// Log progress and external commands.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into its destination directory.
    Build(BuildArgs),
    /// Expand the diagram blocks of one page.
    Render(RenderArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Render(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_force() {
        let cli = Cli::try_parse_from(["mpfig", "build", "--force", "-d", "public"]).unwrap();
        assert!(matches!(cli.command, Commands::Build(_)));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_render_verbose() {
        let cli = Cli::try_parse_from(["mpfig", "render", "index.md", "--verbose"]).unwrap();
        assert!(matches!(cli.command, Commands::Render(_)));
        assert!(cli.verbose);
    }
}
