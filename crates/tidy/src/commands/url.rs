//! `tidy url` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tidy_config::{CliSettings, Config};
use tidy_plantuml::{encode_bytes, render_url};

use super::{load_config, output_format, read_source};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the url command.
#[derive(Args)]
pub(crate) struct UrlArgs {
    /// `PlantUML` source file (reads stdin when omitted).
    file: Option<PathBuf>,

    /// Output format: svg, png or uml (overrides config).
    #[arg(short, long)]
    format: Option<String>,

    /// `PlantUML` server URL (overrides config).
    #[arg(long)]
    server_url: Option<String>,
}

impl UrlArgs {
    /// Execute the url command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the description cannot be encoded.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            server_url: self.server_url,
            format: self.format,
            ..Default::default()
        };
        let config = load_config(config_path, &cli_settings)?;

        let source = read_source(self.file.as_deref())?;
        let url = url_for_source(&config, &source)?;

        output.result(&url);
        Ok(())
    }
}

/// Encode raw source bytes into a render URL for the configured server.
fn url_for_source(config: &Config, source: &[u8]) -> Result<String, CliError> {
    let token = encode_bytes(source)?;
    Ok(render_url(
        &config.plantuml.server_url,
        &token,
        output_format(config)?,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tidy_plantuml::EncodingError;

    use super::*;

    #[test]
    fn test_url_for_source_uses_configured_server_and_format() {
        let mut config = Config::default();
        config.plantuml.server_url = "http://renderer.local/".to_owned();
        config.plantuml.format = "png".to_owned();

        let url = url_for_source(&config, b"@startuml\nAlice -> Bob: Hi!\n@enduml\n").unwrap();

        assert_eq!(
            url,
            "http://renderer.local/plantuml/png/SoWkIImgAStDuNBCoKnELT2rKt3AJx9IyCXKv798pKi1oW00"
        );
    }

    #[test]
    fn test_url_for_source_rejects_invalid_utf8() {
        let err = url_for_source(&Config::default(), b"@startuml\n\xff\n@enduml").unwrap_err();
        assert!(matches!(
            err,
            CliError::Encoding(EncodingError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_url_for_source_rejects_blank_input() {
        let err = url_for_source(&Config::default(), b"  \n").unwrap_err();
        assert!(matches!(err, CliError::Encoding(EncodingError::Empty)));
    }
}
