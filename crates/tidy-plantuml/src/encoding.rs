//! `PlantUML` text encoding.
//!
//! The `PlantUML` server expects diagram source in the URL path as a
//! compressed, base64-like token:
//! - zlib-compress the trimmed source, then drop the 2-byte zlib header and
//!   the 4-byte Adler-32 trailer, leaving the raw deflate payload
//! - base64-encode the payload and map every symbol onto the `PlantUML`
//!   alphabet (`0-9A-Za-z-_`), without padding
//!
//! Everything server-specific lives behind [`encode`], so a change in the
//! server's convention touches a single function.

use std::fmt;
use std::io::Write;

use base64::Engine;
use base64::prelude::BASE64_STANDARD_NO_PAD;
use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::format::OutputFormat;

/// Length of the zlib stream header (CMF + FLG).
const ZLIB_HEADER_LEN: usize = 2;

/// Length of the zlib stream trailer (Adler-32 checksum).
const ZLIB_TRAILER_LEN: usize = 4;

/// Standard base64 alphabet, in index order.
const BASE64_SYMBOLS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// `PlantUML` alphabet, in index order.
const PLANTUML_SYMBOLS: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Byte-indexed substitution table from base64 symbols to `PlantUML` symbols.
static SUBSTITUTION: [u8; 256] = build_substitution();

#[allow(clippy::cast_lossless)]
const fn build_substitution() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < BASE64_SYMBOLS.len() {
        table[BASE64_SYMBOLS[i] as usize] = PLANTUML_SYMBOLS[i];
        i += 1;
    }
    table
}

/// Error while encoding a diagram description.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// Input bytes are not valid UTF-8.
    #[error("diagram description is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// Input is empty after trimming whitespace.
    #[error("diagram description is empty")]
    Empty,
    /// Compressor failed to write the payload.
    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// URL-safe token understood by the `PlantUML` server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedToken(String);

impl EncodedToken {
    /// Token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a diagram description into a `PlantUML` token.
///
/// Leading and trailing whitespace is ignored, so indented or padded sources
/// produce the same token.
///
/// # Errors
///
/// Returns [`EncodingError::Empty`] for blank input.
pub fn encode(description: &str) -> Result<EncodedToken, EncodingError> {
    let text = description.trim();
    if text.is_empty() {
        return Err(EncodingError::Empty);
    }

    let payload = deflate_payload(text.as_bytes())?;
    let token = BASE64_STANDARD_NO_PAD
        .encode(payload)
        .bytes()
        .map(|b| char::from(SUBSTITUTION[usize::from(b)]))
        .collect();

    Ok(EncodedToken(token))
}

/// Encode raw description bytes (e.g. read from a file).
///
/// # Errors
///
/// Returns [`EncodingError::InvalidUtf8`] if `raw` is not valid UTF-8.
pub fn encode_bytes(raw: &[u8]) -> Result<EncodedToken, EncodingError> {
    encode(std::str::from_utf8(raw)?)
}

/// Compress with zlib framing, keeping only the deflate payload.
fn deflate_payload(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len()), Compression::default());
    encoder.write_all(data)?;
    let stream = encoder.finish()?;

    // A finished zlib stream always carries both header and trailer.
    Ok(stream[ZLIB_HEADER_LEN..stream.len() - ZLIB_TRAILER_LEN].to_vec())
}

/// Build the render URL for a diagram description.
///
/// Pure string construction; no request is made.
///
/// # Errors
///
/// Propagates [`EncodingError`] from [`encode`].
pub fn build_render_url(
    server_url: &str,
    description: &str,
    format: OutputFormat,
) -> Result<String, EncodingError> {
    let token = encode(description)?;
    Ok(render_url(server_url, &token, format))
}

/// Render URL for an already encoded token.
#[must_use]
pub fn render_url(server_url: &str, token: &EncodedToken, format: OutputFormat) -> String {
    let server_url = server_url.trim_end_matches('/');
    format!("{server_url}/plantuml/{format}/{token}")
}

/// A description paired with the format it should be rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Diagram source, treated as opaque text.
    pub description: String,
    /// Requested output format.
    pub format: OutputFormat,
}

impl RenderRequest {
    /// Create a render request for the default format (SVG).
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            format: OutputFormat::default(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Render URL on the given server.
    ///
    /// # Errors
    ///
    /// Propagates [`EncodingError`] from [`encode`].
    pub fn url(&self, server_url: &str) -> Result<String, EncodingError> {
        build_render_url(server_url, &self.description, self.format)
    }
}
