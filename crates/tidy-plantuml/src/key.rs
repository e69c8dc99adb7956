//! Artifact key computation.
//!
//! Provides [`ArtifactKey`] for deriving content-based file names for
//! rendered artifacts.

use sha2::{Digest, Sha256};

use crate::format::OutputFormat;

/// Number of hex characters of the hash used in file names.
const FILE_HASH_LEN: usize = 12;

/// Parameters that determine a rendered artifact.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactKey<'a> {
    /// Diagram description (whitespace-trimmed before hashing).
    pub description: &'a str,
    /// Render server base URL.
    pub server_url: &'a str,
    /// Output format.
    pub format: OutputFormat,
}

impl ArtifactKey<'_> {
    /// Compute a content hash for this key.
    ///
    /// SHA-256 of `"{server_url}:{format}:{description}"`, hex-encoded.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!(
            "{}:{}:{}",
            self.server_url.trim_end_matches('/'),
            self.format,
            self.description.trim()
        );
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Deterministic file name, e.g. `diagram_1a2b3c4d5e6f.svg`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let hash = self.compute_hash();
        format!(
            "diagram_{}.{}",
            &hash[..FILE_HASH_LEN],
            self.format.extension()
        )
    }
}
