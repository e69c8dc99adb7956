//! CLI command implementations.

pub(crate) mod download;
pub(crate) mod iterate;
pub(crate) mod render;
pub(crate) mod url;

use std::io::Read;
use std::path::{Path, PathBuf};

use tidy_config::{CliSettings, Config};
use tidy_plantuml::{GuidancePolicy, OutputFormat, Validator};

use crate::error::CliError;

pub(crate) use download::DownloadArgs;
pub(crate) use iterate::IterateArgs;
pub(crate) use render::RenderArgs;
pub(crate) use url::UrlArgs;

/// Load config with CLI overrides applied.
fn load_config(config_path: Option<&Path>, settings: &CliSettings) -> Result<Config, CliError> {
    Ok(Config::load(config_path, Some(settings))?)
}

/// Read raw source bytes from `file`, or from stdin when `None`.
fn read_source(file: Option<&Path>) -> Result<Vec<u8>, CliError> {
    match file {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Read a diagram description as text.
fn read_description(file: Option<&Path>) -> Result<String, CliError> {
    String::from_utf8(read_source(file)?)
        .map_err(|e| tidy_plantuml::EncodingError::from(e.utf8_error()).into())
}

/// Output format from the validated config.
fn output_format(config: &Config) -> Result<OutputFormat, CliError> {
    OutputFormat::parse(&config.plantuml.format).ok_or_else(|| {
        CliError::Validation(format!("unknown output format '{}'", config.plantuml.format))
    })
}

/// Artifact validator from the iteration config.
fn validator(config: &Config) -> Validator {
    let validator = Validator::new().min_bytes(config.iteration.min_artifact_bytes);
    match &config.iteration.error_markers {
        Some(markers) => validator.error_markers(markers.iter().cloned()),
        None => validator,
    }
}

/// Limits quoted in the iteration guidance.
fn guidance_policy(config: &Config) -> GuidancePolicy {
    GuidancePolicy {
        max_attempts: config.iteration.max_attempts,
        min_bytes: config.iteration.min_artifact_bytes,
    }
}

/// Scratch directory from config, falling back to the environment default.
fn scratch_dir(config: &Config) -> PathBuf {
    config
        .download_resolved
        .scratch_dir
        .clone()
        .unwrap_or_else(tidy_plantuml::scratch_dir)
}
