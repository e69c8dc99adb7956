//! `tidy render` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tidy_config::{CliSettings, Config};
use tidy_plantuml::{
    ArtifactKey, AttemptFailure, HttpFetcher, IterationSession, Outcome, OutputFormat, persist,
};

use super::{load_config, output_format, read_description, scratch_dir, validator};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// `PlantUML` source file (reads stdin when omitted).
    file: Option<PathBuf>,

    /// Output format: svg, png or uml (overrides config).
    #[arg(short, long)]
    format: Option<String>,

    /// `PlantUML` server URL (overrides config).
    #[arg(long)]
    server_url: Option<String>,

    /// Destination file (default: content-addressed name in the scratch directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Attempt budget (overrides config).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// HTTP timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Scratch directory for downloads (overrides config).
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the description cannot be
    /// encoded, the diagram is rejected, or the artifact cannot be saved.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            server_url: self.server_url,
            format: self.format,
            timeout_secs: self.timeout,
            max_attempts: self.max_attempts,
            scratch_dir: self.scratch_dir,
        };
        let config = load_config(config_path, &cli_settings)?;
        let format = output_format(&config)?;

        let description = read_description(self.file.as_deref())?;
        let destination = self
            .output
            .unwrap_or_else(|| default_destination(&config, &description, format));
        tracing::debug!(destination = %destination.display(), "Render destination");

        output.info(&format!(
            "Rendering {format} via {} (up to {} attempt(s))",
            config.plantuml.server_url, config.iteration.max_attempts
        ));

        let session = IterationSession::new(HttpFetcher::new(config.plantuml.timeout()))
            .server_url(config.plantuml.server_url.as_str())
            .format(format)
            .max_attempts(config.iteration.max_attempts)
            .validator(validator(&config));

        let outcome = session.run(description, |failure, previous| {
            output.warning(&format!("Attempt failed: {failure}"));
            retry_transient(failure, previous)
        })?;

        let saved = finish(outcome, &destination, &output)?;
        output.result(&saved.display().to_string());
        Ok(())
    }
}

/// Resubmit the same description after fetch failures.
///
/// Validation failures need a revised description, which this command cannot
/// produce, so the session stops.
fn retry_transient(failure: &AttemptFailure, previous: &str) -> Option<String> {
    match failure {
        AttemptFailure::Fetch(_) => Some(previous.to_owned()),
        AttemptFailure::Validation(_) => None,
    }
}

/// Content-addressed file in the scratch directory.
fn default_destination(config: &Config, description: &str, format: OutputFormat) -> PathBuf {
    let key = ArtifactKey {
        description,
        server_url: &config.plantuml.server_url,
        format,
    };
    scratch_dir(config).join(key.file_name())
}

/// Persist an accepted artifact, or describe why the session ended.
fn finish(outcome: Outcome, destination: &Path, output: &Output) -> Result<PathBuf, CliError> {
    let state = outcome.state();
    if let Some(url) = state.last_url() {
        output.detail(&format!("Last URL: {url}"));
    }
    if let Some(artifact) = state.last_artifact() {
        output.detail(&format!("Last artifact: {} bytes", artifact.byte_length()));
    }

    match outcome {
        Outcome::Accepted(state) => {
            let attempts = state.attempt() + 1;
            let Some(artifact) = state.into_artifact() else {
                return Err(CliError::Validation(
                    "accepted session has no artifact".to_owned(),
                ));
            };
            let saved = persist(&artifact, destination)?;
            output.success(&format!(
                "Accepted after {attempts} attempt(s), saved {}",
                saved.display()
            ));
            Ok(saved)
        }
        Outcome::Exhausted(state) | Outcome::Abandoned(state) => {
            let reason = state
                .last_error()
                .map_or_else(|| "unknown failure".to_owned(), ToString::to_string);
            Err(CliError::Rejected {
                attempts: state.attempt(),
                reason,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tidy_plantuml::{
        FetchError, FetchErrorKind, Fetcher, RenderedArtifact, ValidationFailure, Validator,
    };

    use super::*;

    const DIAGRAM: &str = "@startuml\nAlice -> Bob: Hi!\n@enduml";

    /// Fetcher that always answers with the same result.
    struct Fixed(Result<Vec<u8>, FetchErrorKind>);

    impl Fetcher for Fixed {
        fn fetch(&self, url: &str) -> Result<RenderedArtifact, FetchError> {
            match &self.0 {
                Ok(bytes) => Ok(RenderedArtifact::new(url, bytes.clone())),
                Err(kind) => Err(FetchError {
                    url: url.to_owned(),
                    kind: kind.clone(),
                }),
            }
        }
    }

    fn run(fetcher: Fixed) -> Outcome {
        IterationSession::new(fetcher)
            .validator(Validator::new().min_bytes(10))
            .run(DIAGRAM, retry_transient)
            .unwrap()
    }

    #[test]
    fn test_retry_transient_resubmits_fetch_failures() {
        let failure = AttemptFailure::Fetch(FetchError {
            url: "https://plantuml.com/svg/x".to_owned(),
            kind: FetchErrorKind::Timeout,
        });

        assert_eq!(
            retry_transient(&failure, DIAGRAM),
            Some(DIAGRAM.to_owned())
        );
    }

    #[test]
    fn test_retry_transient_stops_on_validation_failure() {
        let failure = AttemptFailure::Validation(ValidationFailure::Empty);
        assert_eq!(retry_transient(&failure, DIAGRAM), None);
    }

    #[test]
    fn test_default_destination_is_content_addressed() {
        let mut config = Config::default();
        config.download_resolved.scratch_dir = Some(PathBuf::from("/scratch"));

        let path = default_destination(&config, DIAGRAM, OutputFormat::Svg);
        let expected = ArtifactKey {
            description: DIAGRAM,
            server_url: "https://plantuml.com",
            format: OutputFormat::Svg,
        }
        .file_name();

        assert_eq!(path, Path::new("/scratch").join(expected));
        assert_eq!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("svg")
        );
    }

    #[test]
    fn test_finish_persists_accepted_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("out").join("diagram.svg");
        let outcome = run(Fixed(Ok(b"<svg>a valid diagram</svg>".to_vec())));

        let saved = finish(outcome, &destination, &Output::new()).unwrap();

        assert_eq!(saved, destination);
        assert_eq!(
            std::fs::read(&destination).unwrap(),
            b"<svg>a valid diagram</svg>"
        );
    }

    #[test]
    fn test_finish_rejects_abandoned_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("diagram.svg");
        let outcome = run(Fixed(Ok(b"<svg>Syntax Error?</svg>".to_vec())));
        assert!(matches!(outcome, Outcome::Abandoned(_)));

        let err = finish(outcome, &destination, &Output::new()).unwrap_err();

        assert!(matches!(err, CliError::Rejected { attempts: 1, .. }));
        assert!(err.to_string().contains("Syntax Error"));
        assert!(!destination.exists());
    }

    #[test]
    fn test_finish_rejects_exhausted_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("diagram.svg");
        let outcome = run(Fixed(Err(FetchErrorKind::Timeout)));
        assert!(matches!(outcome, Outcome::Exhausted(_)));

        let err = finish(outcome, &destination, &Output::new()).unwrap_err();

        assert!(matches!(err, CliError::Rejected { attempts: 3, .. }));
        assert!(!destination.exists());
    }
}
