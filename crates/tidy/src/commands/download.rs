//! `tidy download` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tidy_config::CliSettings;
use tidy_plantuml::{HttpFetcher, SCRATCH_FILE_NAME, download};

use super::{load_config, scratch_dir};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the download command.
#[derive(Args)]
pub(crate) struct DownloadArgs {
    /// Render URL to download.
    url: String,

    /// Destination file (default: tmp-puml.svg in the scratch directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTTP timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,
}

impl DownloadArgs {
    /// Execute the download command.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file cannot be written.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            timeout_secs: self.timeout,
            ..Default::default()
        };
        let config = load_config(config_path, &cli_settings)?;

        let destination = self
            .output
            .unwrap_or_else(|| scratch_dir(&config).join(SCRATCH_FILE_NAME));
        let fetcher = HttpFetcher::new(config.plantuml.timeout());

        let saved = download(&fetcher, &self.url, &destination)?;

        output.success(&format!("Saved {}", saved.display()));
        output.result(&saved.display().to_string());
        Ok(())
    }
}
