//! Artifact fetching and persistence.
//!
//! This module resolves render URLs to bytes and writes them to disk:
//! - [`Fetcher`] is the seam the iteration controller drives
//! - [`HttpFetcher`] issues blocking GET requests, following redirects
//! - [`persist`] writes an artifact, creating missing parent directories
//!
//! The server answers diagram syntax errors with a normal `200` image, so a
//! successful fetch says nothing about diagram validity; see
//! [`Validator`](crate::Validator).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ureq::Agent;

use crate::consts::{DEFAULT_TIMEOUT, MAX_REDIRECTS};

/// Rendered artifact returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// URL the artifact was requested from (before redirects).
    pub source_url: String,
    /// Response body.
    pub bytes: Vec<u8>,
}

impl RenderedArtifact {
    /// Create an artifact from a URL and body.
    #[must_use]
    pub fn new(source_url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source_url: source_url.into(),
            bytes,
        }
    }

    /// Size of the body in bytes.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

/// Fetch failure for a single URL.
#[derive(Debug, Clone, thiserror::Error)]
#[error("fetch {url}: {kind}")]
pub struct FetchError {
    /// URL that was requested.
    pub url: String,
    /// What went wrong.
    pub kind: FetchErrorKind,
}

impl FetchError {
    fn new(url: &str, kind: FetchErrorKind) -> Self {
        Self {
            url: url.to_owned(),
            kind,
        }
    }
}

/// Kind of fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchErrorKind {
    /// No complete response within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// The request could not be completed (connection or redirect failure).
    #[error("transport error: {0}")]
    Transport(String),
    /// Final response had a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchErrorKind {
    fn from_transport(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Timeout(_) => Self::Timeout,
            other => Self::Transport(other.to_string()),
        }
    }

    fn from_body(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Timeout(_) => Self::Timeout,
            other => Self::Body(other.to_string()),
        }
    }
}

/// Failure writing an artifact to disk.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Parent directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Destination file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure of a fetch-and-save operation.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Resolves a render URL to an artifact.
pub trait Fetcher {
    /// Fetch the artifact at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, timeout or non-2xx status.
    fn fetch(&self, url: &str) -> Result<RenderedArtifact, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<RenderedArtifact, FetchError> {
        (**self).fetch(url)
    }
}

/// Create HTTP agent with the specified timeout.
///
/// Redirects are followed up to [`MAX_REDIRECTS`]; status codes are checked by
/// the caller so error bodies can be reported.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .max_redirects(MAX_REDIRECTS)
        .build()
        .into()
}

/// Blocking HTTP fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            timeout,
        }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RenderedArtifact, FetchError> {
        tracing::debug!(url, timeout = ?self.timeout, "Fetching artifact");

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::new(url, FetchErrorKind::from_transport(e)))?;

        let status = response.status();
        let mut body = response.into_body();

        if !status.is_success() {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(FetchError::new(
                url,
                FetchErrorKind::Status {
                    status: status.as_u16(),
                    body: error_body,
                },
            ));
        }

        let bytes = body
            .read_to_vec()
            .map_err(|e| FetchError::new(url, FetchErrorKind::from_body(e)))?;

        tracing::debug!(url, bytes = bytes.len(), "Fetched artifact");
        Ok(RenderedArtifact::new(url, bytes))
    }
}

/// Write an artifact to `destination`, creating missing parent directories.
///
/// An existing file is overwritten, so repeating a save is harmless.
///
/// # Errors
///
/// Returns [`PersistError`] if the parent directory cannot be created or the
/// file cannot be written.
pub fn persist(artifact: &RenderedArtifact, destination: &Path) -> Result<PathBuf, PersistError> {
    if let Some(parent) = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(destination, &artifact.bytes).map_err(|source| PersistError::Write {
        path: destination.to_path_buf(),
        source,
    })?;

    tracing::info!(
        path = %destination.display(),
        bytes = artifact.byte_length(),
        "Saved artifact"
    );
    Ok(destination.to_path_buf())
}

/// Fetch `url` and save the artifact to `destination`.
///
/// # Errors
///
/// Returns [`DownloadError`] wrapping the fetch or persistence failure.
pub fn download<F: Fetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    destination: &Path,
) -> Result<PathBuf, DownloadError> {
    let artifact = fetcher.fetch(url)?;
    Ok(persist(&artifact, destination)?)
}

/// Default scratch directory for downloads.
///
/// Uses `TMPDIR` when set and non-empty, otherwise the platform temp directory.
#[must_use]
pub fn scratch_dir() -> PathBuf {
    scratch_dir_from(std::env::var_os("TMPDIR"))
}

fn scratch_dir_from(tmpdir: Option<OsString>) -> PathBuf {
    tmpdir
        .filter(|dir| !dir.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from)
}
