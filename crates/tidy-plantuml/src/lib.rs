//! `PlantUML` rendering pipeline for tidy.
//!
//! This crate turns diagram descriptions into rendered artifacts:
//! - Encodes descriptions into `PlantUML` server tokens and render URLs
//! - Fetches artifacts over HTTP, following redirects, with a hard timeout
//! - Validates artifacts in-band (the server embeds errors in the image)
//! - Drives a bounded generate, fetch, validate, retry loop
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - [`encoding`]: Token encoding and render URL construction
//! - [`fetch`]: `Fetcher` trait, HTTP implementation and persistence
//! - [`validate`]: Artifact validation rules
//! - [`iteration`]: `IterationSession` state machine
//! - [`guidance`]: Protocol text for callers driving the loop themselves
//!
//! # Example
//!
//! ```no_run
//! use tidy_plantuml::{HttpFetcher, IterationSession, Outcome};
//!
//! let source = "@startuml\nAlice -> Bob: Hi!\n@enduml";
//! let outcome = IterationSession::new(HttpFetcher::default())
//!     .run(source, |_, previous| Some(previous.to_owned()))?;
//!
//! if let Outcome::Accepted(state) = outcome {
//!     println!("rendered {}", state.last_url().unwrap_or_default());
//! }
//! # Ok::<(), tidy_plantuml::IterationError>(())
//! ```

mod consts;
pub mod encoding;
pub mod fetch;
mod format;
pub mod guidance;
pub mod iteration;
mod key;
pub mod validate;

pub use consts::{
    DEFAULT_ERROR_MARKERS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_BYTES, DEFAULT_SERVER_URL,
    DEFAULT_TIMEOUT, SCRATCH_FILE_NAME,
};
pub use encoding::{
    EncodedToken, EncodingError, RenderRequest, build_render_url, encode, encode_bytes, render_url,
};
pub use fetch::{
    DownloadError, FetchError, FetchErrorKind, Fetcher, HttpFetcher, PersistError,
    RenderedArtifact, download, persist, scratch_dir,
};
pub use format::OutputFormat;
pub use guidance::{GuidancePolicy, iteration_guidance};
pub use iteration::{
    AttemptFailure, Event, IterationError, IterationSession, IterationState, Outcome, Phase,
    Step,
};
pub use key::ArtifactKey;
pub use validate::{ValidationFailure, Validator};
