//! tidy CLI - `PlantUML` rendering helper.
//!
//! Provides commands for:
//! - `url`: Build the render URL for a diagram description
//! - `download`: Download a rendered diagram
//! - `iterate`: Print the generate/download/validate protocol for an agent
//! - `render`: Render a diagram, retrying transient failures, and save it

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DownloadArgs, IterateArgs, RenderArgs, UrlArgs};
use output::Output;

/// tidy - `PlantUML` rendering helper.
#[derive(Parser)]
#[command(name = "tidy", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover tidy.toml).
    #[arg(short, long, global = true, env = "TIDY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (request and attempt logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the render URL for a diagram description.
    Url(UrlArgs),
    /// Download a rendered diagram to a file.
    Download(DownloadArgs),
    /// Print instructions for iterating on a diagram.
    Iterate(IterateArgs),
    /// Render a diagram until it validates, then save it.
    Render(RenderArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Url(args) => args.execute(config),
        Commands::Download(args) => args.execute(config),
        Commands::Iterate(args) => args.execute(config),
        Commands::Render(args) => args.execute(config),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
