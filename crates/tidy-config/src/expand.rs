//! Environment variable expansion for configuration strings.
//!
//! Only braced references are expanded; a bare `$VAR` is kept as written so
//! URLs containing `$` survive untouched.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the config key in error messages. Strings without `${` are
/// returned unchanged.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.var_name),
    })
}

/// Like [`expand_env`], additionally expanding a leading `~`.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    let expanded = expand_env(value, field)?;
    Ok(shellexpand::tilde(&expanded).into_owned())
}

/// Variable that could not be resolved.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET: &str = "TIDY_CONFIG_TEST_VARIABLE_THAT_IS_NEVER_SET";

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(
            expand_env("https://plantuml.com", "plantuml.server_url").unwrap(),
            "https://plantuml.com"
        );
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = format!("${{{UNSET}:-https://fallback.example}}");
        assert_eq!(
            expand_env(&value, "plantuml.server_url").unwrap(),
            "https://fallback.example"
        );
    }

    #[test]
    fn test_unset_without_default_is_error() {
        let value = format!("${{{UNSET}}}");
        let err = expand_env(&value, "plantuml.server_url").unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("plantuml.server_url"));
        assert!(err.to_string().contains(UNSET));
    }

    #[test]
    fn test_unset_error_names_variable() {
        let value = format!("https://${{{UNSET}}}/render");
        let err = expand_env(&value, "plantuml.server_url").unwrap_err();

        let ConfigError::EnvVar { field, message } = err else {
            panic!("expected EnvVar error");
        };
        assert_eq!(field, "plantuml.server_url");
        assert_eq!(message, format!("${{{UNSET}}} not set"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let value = format!("${UNSET}");
        assert_eq!(expand_env(&value, "plantuml.server_url").unwrap(), value);
    }

    #[test]
    fn test_url_with_dollar_not_expanded() {
        let value = format!("https://plantuml.example/${UNSET}");
        assert_eq!(expand_env(&value, "plantuml.server_url").unwrap(), value);
    }

    #[test]
    fn test_expand_path_leaves_bare_dollar() {
        assert_eq!(
            expand_path("scratch/$diagrams", "download.scratch_dir").unwrap(),
            "scratch/$diagrams"
        );
    }

    #[test]
    fn test_expand_path_keeps_relative_paths() {
        assert_eq!(
            expand_path("scratch/diagrams", "download.scratch_dir").unwrap(),
            "scratch/diagrams"
        );
    }
}
