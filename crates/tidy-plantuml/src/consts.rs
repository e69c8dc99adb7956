//! Internal constants for diagram rendering.

use std::time::Duration;

/// Public `PlantUML` server used when no server URL is configured.
pub const DEFAULT_SERVER_URL: &str = "https://plantuml.com";

/// Default HTTP timeout for render requests (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of redirects followed for a single fetch.
pub const MAX_REDIRECTS: u32 = 10;

/// Default attempt budget for an iteration session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default minimum artifact size in bytes (heuristic, `0` disables the check).
pub const DEFAULT_MIN_BYTES: usize = 1000;

/// Error texts the `PlantUML` server embeds in rendered error images.
pub const DEFAULT_ERROR_MARKERS: &[&str] = &[
    "Syntax Error",
    "An error has occured",
    "An error has occurred",
    "Cannot find Graphviz",
];

/// File name used for caller-driven downloads inside the scratch directory.
pub const SCRATCH_FILE_NAME: &str = "tmp-puml.svg";
