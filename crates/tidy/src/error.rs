//! CLI error types.

use tidy_config::ConfigError;
use tidy_plantuml::{DownloadError, EncodingError, IterationError, PersistError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Encoding(#[from] EncodingError),

    #[error("{0}")]
    Download(#[from] DownloadError),

    #[error("{0}")]
    Persist(#[from] PersistError),

    #[error("{0}")]
    Iteration(#[from] IterationError),

    #[error("diagram rejected after {attempts} attempt(s): {reason}")]
    Rejected { attempts: u32, reason: String },

    #[error("{0}")]
    Validation(String),
}
