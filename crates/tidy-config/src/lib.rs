//! Configuration management for tidy.
//!
//! Parses `tidy.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `plantuml.server_url`
//! - `download.scratch_dir` (also expands a leading `~`)

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tidy_plantuml::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_BYTES, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT, OutputFormat,
};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override render server URL.
    pub server_url: Option<String>,
    /// Override output format.
    pub format: Option<String>,
    /// Override HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Override attempt budget.
    pub max_attempts: Option<u32>,
    /// Override scratch directory.
    pub scratch_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tidy.toml";

/// Upper bound for the attempt budget.
const MAX_ATTEMPTS_LIMIT: u32 = 20;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render server configuration.
    pub plantuml: PlantUmlConfig,
    /// Iteration loop configuration.
    pub iteration: IterationConfig,
    /// Download configuration (paths are strings from TOML).
    download: DownloadConfigRaw,

    /// Resolved download configuration (set after loading).
    #[serde(skip)]
    pub download_resolved: DownloadConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Render server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlantUmlConfig {
    /// `PlantUML` server base URL.
    pub server_url: String,
    /// Default output format (`uml`, `png` or `svg`).
    pub format: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            format: OutputFormat::default().to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl PlantUmlConfig {
    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Iteration loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    /// Maximum number of attempts per session.
    pub max_attempts: u32,
    /// Minimum plausible artifact size in bytes (`0` disables the check).
    pub min_artifact_bytes: usize,
    /// Error texts that mark an artifact invalid (replaces the built-in list).
    pub error_markers: Option<Vec<String>>,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_artifact_bytes: DEFAULT_MIN_BYTES,
            error_markers: None,
        }
    }
}

/// Raw download configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DownloadConfigRaw {
    scratch_dir: Option<String>,
}

/// Resolved download configuration.
#[derive(Debug, Default)]
pub struct DownloadConfig {
    /// Scratch directory for downloads; `None` uses the environment default.
    pub scratch_dir: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`plantuml.server_url`").
        field: String,
        /// Error message.
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tidy.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and validated with the rest of
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(server_url) = &settings.server_url {
            self.plantuml.server_url.clone_from(server_url);
        }
        if let Some(format) = &settings.format {
            self.plantuml.format.clone_from(format);
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            self.plantuml.timeout_secs = timeout_secs;
        }
        if let Some(max_attempts) = settings.max_attempts {
            self.iteration.max_attempts = max_attempts;
        }
        if let Some(scratch_dir) = &settings.scratch_dir {
            self.download_resolved.scratch_dir = Some(scratch_dir.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_plantuml()?;
        self.validate_iteration()?;
        Ok(())
    }

    /// Validate render server configuration.
    fn validate_plantuml(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.plantuml.server_url, "plantuml.server_url")?;
        require_http_url(&self.plantuml.server_url, "plantuml.server_url")?;

        if OutputFormat::parse(&self.plantuml.format).is_none() {
            return Err(ConfigError::Validation(format!(
                "plantuml.format must be one of uml, png, svg, got '{}'",
                self.plantuml.format
            )));
        }

        if self.plantuml.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "plantuml.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate iteration configuration.
    fn validate_iteration(&self) -> Result<(), ConfigError> {
        let max_attempts = self.iteration.max_attempts;
        if max_attempts == 0 {
            return Err(ConfigError::Validation(
                "iteration.max_attempts must be greater than 0".to_owned(),
            ));
        }
        if max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::Validation(format!(
                "iteration.max_attempts cannot exceed {MAX_ATTEMPTS_LIMIT}"
            )));
        }

        if let Some(markers) = &self.iteration.error_markers
            && markers.iter().any(|m| m.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "iteration.error_markers cannot contain empty entries".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.plantuml.server_url =
            expand::expand_env(&self.plantuml.server_url, "plantuml.server_url")?;

        if let Some(ref dir) = self.download.scratch_dir {
            self.download.scratch_dir = Some(expand::expand_path(dir, "download.scratch_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.download_resolved = DownloadConfig {
            scratch_dir: self
                .download
                .scratch_dir
                .as_deref()
                .filter(|dir| !dir.is_empty())
                .map(|dir| config_dir.join(dir)),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.plantuml.server_url, "https://plantuml.com");
        assert_eq!(config.plantuml.format, "svg");
        assert_eq!(config.plantuml.timeout(), Duration::from_secs(10));
        assert_eq!(config.iteration.max_attempts, 3);
        assert_eq!(config.iteration.min_artifact_bytes, 1000);
        assert!(config.iteration.error_markers.is_none());
        assert!(config.download_resolved.scratch_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_follow_renderer_constants() {
        let config = Config::default();
        assert_eq!(config.plantuml.server_url, DEFAULT_SERVER_URL);
        assert_eq!(
            OutputFormat::parse(&config.plantuml.format),
            Some(OutputFormat::default())
        );
        assert_eq!(config.plantuml.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.iteration.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.iteration.min_artifact_bytes, DEFAULT_MIN_BYTES);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.plantuml.server_url, "https://plantuml.com");
        assert_eq!(config.iteration.max_attempts, 3);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[plantuml]
server_url = "http://localhost:8080"
format = "png"
timeout_secs = 30

[iteration]
max_attempts = 5
min_artifact_bytes = 0
error_markers = ["Syntax Error", "Dot executable"]

[download]
scratch_dir = "out"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.plantuml.server_url, "http://localhost:8080");
        assert_eq!(config.plantuml.format, "png");
        assert_eq!(config.plantuml.timeout_secs, 30);
        assert_eq!(config.iteration.max_attempts, 5);
        assert_eq!(config.iteration.min_artifact_bytes, 0);
        assert_eq!(
            config.iteration.error_markers,
            Some(vec!["Syntax Error".to_owned(), "Dot executable".to_owned()])
        );
        assert_eq!(config.download.scratch_dir.as_deref(), Some("out"));
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[download]
scratch_dir = "scratch/diagrams"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.download_resolved.scratch_dir,
            Some(PathBuf::from("/project/scratch/diagrams"))
        );
    }

    #[test]
    fn test_resolve_paths_keeps_absolute_scratch_dir() {
        let toml = r#"
[download]
scratch_dir = "/var/tmp/tidy"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.download_resolved.scratch_dir,
            Some(PathBuf::from("/var/tmp/tidy"))
        );
    }

    #[test]
    fn test_no_download_section_uses_environment_default() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(config.download_resolved.scratch_dir.is_none());
    }

    #[test]
    fn test_validate_rejects_non_http_server_url() {
        let mut config = Config::default();
        config.plantuml.server_url = "ftp://plantuml.com".to_owned();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("plantuml.server_url"));
    }

    #[test]
    fn test_validate_rejects_empty_server_url() {
        let mut config = Config::default();
        config.plantuml.server_url = String::new();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let mut config = Config::default();
        config.plantuml.format = "pdf".to_owned();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("plantuml.format"));
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.plantuml.timeout_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_attempt_budget_bounds() {
        let mut config = Config::default();

        config.iteration.max_attempts = 0;
        assert!(config.validate().is_err());

        config.iteration.max_attempts = MAX_ATTEMPTS_LIMIT + 1;
        assert!(config.validate().is_err());

        config.iteration.max_attempts = MAX_ATTEMPTS_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_error_marker() {
        let mut config = Config::default();
        config.iteration.error_markers = Some(vec!["Syntax Error".to_owned(), " ".to_owned()]);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("iteration.error_markers"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let overrides = CliSettings {
            server_url: Some("http://localhost:8080".to_owned()),
            max_attempts: Some(7),
            scratch_dir: Some(PathBuf::from("/custom/scratch")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.plantuml.server_url, "http://localhost:8080");
        assert_eq!(config.iteration.max_attempts, 7);
        assert_eq!(
            config.download_resolved.scratch_dir,
            Some(PathBuf::from("/custom/scratch"))
        );
        // Unchanged
        assert_eq!(config.plantuml.format, "svg");
        assert_eq!(config.plantuml.timeout_secs, 10);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/tidy.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_and_validates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tidy.toml");
        std::fs::write(
            &path,
            r#"
[plantuml]
server_url = "${TIDY_CONFIG_TEST_VARIABLE_THAT_IS_NEVER_SET:-http://renderer.local}"

[download]
scratch_dir = "scratch"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.plantuml.server_url, "http://renderer.local");
        assert_eq!(
            config.download_resolved.scratch_dir,
            Some(temp_dir.path().join("scratch"))
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tidy.toml");
        std::fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            format: Some("gif".to_owned()),
            ..Default::default()
        };

        let err = Config::load(Some(&path), Some(&overrides)).unwrap_err();
        assert!(err.to_string().contains("gif"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tidy.toml");
        std::fs::write(&path, "[plantuml\nserver_url = 1").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
