//! In-band artifact validation.
//!
//! The server reports diagram syntax errors inside the image itself, so a
//! `200` response is checked for error text and a plausible size.

use crate::consts::{DEFAULT_ERROR_MARKERS, DEFAULT_MIN_BYTES};
use crate::fetch::RenderedArtifact;

/// Reason an artifact was judged invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    /// Zero-byte body.
    #[error("artifact is empty")]
    Empty,
    /// Body contains an error text the server renders in-band.
    #[error("artifact contains error text '{marker}'")]
    ErrorMarker { marker: String },
    /// Body is smaller than the configured threshold.
    #[error("artifact is {len} bytes, below the {min} byte threshold")]
    TooSmall { len: usize, min: usize },
}

/// Artifact validity checks.
///
/// Checks run in order: non-empty body, absence of error markers, minimum
/// size. The size threshold is a heuristic; set it to `0` to disable it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    min_bytes: usize,
    error_markers: Vec<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_BYTES,
            error_markers: DEFAULT_ERROR_MARKERS
                .iter()
                .map(|&m| m.to_owned())
                .collect(),
        }
    }
}

impl Validator {
    /// Create a validator with the default threshold and markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum artifact size in bytes.
    #[must_use]
    pub fn min_bytes(mut self, min_bytes: usize) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    /// Replace the error markers.
    ///
    /// Markers are matched ASCII case-insensitively. Blank markers are dropped.
    #[must_use]
    pub fn error_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_markers = markers
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.trim().is_empty())
            .collect();
        self
    }

    /// Configured minimum size.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.min_bytes
    }

    /// Configured error markers.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.error_markers
    }

    /// Check an artifact.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationFailure`] found.
    pub fn check(&self, artifact: &RenderedArtifact) -> Result<(), ValidationFailure> {
        let len = artifact.byte_length();
        if len == 0 {
            return Err(ValidationFailure::Empty);
        }

        let content = String::from_utf8_lossy(&artifact.bytes).to_ascii_lowercase();
        if let Some(marker) = self
            .error_markers
            .iter()
            .find(|m| content.contains(&m.to_ascii_lowercase()))
        {
            return Err(ValidationFailure::ErrorMarker {
                marker: marker.clone(),
            });
        }

        if len < self.min_bytes {
            return Err(ValidationFailure::TooSmall {
                len,
                min: self.min_bytes,
            });
        }

        Ok(())
    }
}
