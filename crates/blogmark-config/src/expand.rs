//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Variable referenced by a config value but missing from the environment.
struct MissingVar(String);

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Values without `${` are returned unchanged, so a literal `$` in an
/// address needs no escaping.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| {
        std::env::var(var)
            .map(Some)
            .map_err(|_| MissingVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_whole_value() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("BLOGMARK_EXPAND_ADDR", "https://example.com");
        }
        let result = expand_env("${BLOGMARK_EXPAND_ADDR}", "server.public_address").unwrap();
        assert_eq!(result, "https://example.com");
        unsafe {
            std::env::remove_var("BLOGMARK_EXPAND_ADDR");
        }
    }

    #[test]
    fn test_expand_embedded() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("BLOGMARK_EXPAND_HOST", "blog.example.org");
        }
        let result = expand_env("https://${BLOGMARK_EXPAND_HOST}/", "server.public_address").unwrap();
        assert_eq!(result, "https://blog.example.org/");
        unsafe {
            std::env::remove_var("BLOGMARK_EXPAND_HOST");
        }
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("BLOGMARK_EXPAND_UNSET");
        }
        let result = expand_env(
            "${BLOGMARK_EXPAND_UNSET:-http://localhost:8080}",
            "server.public_address",
        )
        .unwrap();
        assert_eq!(result, "http://localhost:8080");
    }

    #[test]
    fn test_missing_var_names_field_and_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("BLOGMARK_EXPAND_MISSING");
        }
        let err = expand_env("${BLOGMARK_EXPAND_MISSING}", "server.public_address").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("BLOGMARK_EXPAND_MISSING"));
        assert!(message.contains("server.public_address"));
    }

    #[test]
    fn test_plain_values_unchanged() {
        assert_eq!(expand_env("https://example.com", "f").unwrap(), "https://example.com");
        assert_eq!(expand_env("https://example.com/$path", "f").unwrap(), "https://example.com/$path");
        assert_eq!(expand_env("", "f").unwrap(), "");
    }
}
