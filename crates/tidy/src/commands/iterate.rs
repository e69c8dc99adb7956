//! `tidy iterate` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tidy_config::CliSettings;
use tidy_plantuml::iteration_guidance;

use super::{guidance_policy, load_config, read_description, scratch_dir};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the iterate command.
#[derive(Args)]
pub(crate) struct IterateArgs {
    /// File describing the diagram in prose (reads stdin when omitted).
    file: Option<PathBuf>,

    /// Diagram description given inline.
    #[arg(short, long, conflicts_with = "file")]
    description: Option<String>,

    /// Attempt budget quoted in the instructions (overrides config).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Scratch directory for downloads (overrides config).
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

impl IterateArgs {
    /// Execute the iterate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the description cannot be read.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            max_attempts: self.max_attempts,
            scratch_dir: self.scratch_dir,
            ..Default::default()
        };
        let config = load_config(config_path, &cli_settings)?;

        let description = match self.description {
            Some(text) => text,
            None => read_description(self.file.as_deref())?,
        };

        let guidance = iteration_guidance(
            description.trim(),
            &scratch_dir(&config),
            guidance_policy(&config),
        );
        output.result(&guidance);
        Ok(())
    }
}
