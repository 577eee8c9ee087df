//! Configuration for blogmark.
//!
//! Parses `blogmark.toml` with serde and finds the file by searching the
//! current directory and its parents when no path is given.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `server.public_address` supports environment variable references:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "blogmark.toml";

/// Language used when neither the file nor the command line sets one.
const DEFAULT_LANG: &str = "en";

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the public address used for absolute links.
    pub public_address: Option<String>,
    /// Override the default language.
    pub default_lang: Option<String>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Markdown configuration as written in TOML (paths unresolved).
    markdown: MarkdownConfigRaw,

    /// Resolved markdown configuration (set after loading).
    #[serde(skip)]
    pub markdown_resolved: MarkdownConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public address of the site, e.g. `https://example.com`.
    ///
    /// Empty disables absolute links.
    pub public_address: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MarkdownConfigRaw {
    default_lang: Option<String>,
    strings_dir: Option<String>,
}

/// Resolved markdown configuration.
#[derive(Debug)]
pub struct MarkdownConfig {
    /// Language tag for alert titles when a caller gives none.
    pub default_lang: String,
    /// Directory of localized string tables, absolute or relative to the
    /// working directory.
    pub strings_dir: Option<PathBuf>,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            default_lang: DEFAULT_LANG.to_owned(),
            strings_dir: None,
        }
    }
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
        /// Config field path (e.g., "`server.public_address`").
        field: String,
        /// Error message (e.g., "${`SITE_URL`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

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
    /// Otherwise, searches for `blogmark.toml` in the current directory and
    /// its parents, falling back to defaults when none exists.
    ///
    /// CLI settings are applied after loading and validated with the rest of
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            tracing::debug!("No {CONFIG_FILENAME} found, using defaults");
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(public_address) = &settings.public_address {
            self.server.public_address.clone_from(public_address);
        }
        if let Some(default_lang) = &settings.default_lang {
            self.markdown_resolved.default_lang.clone_from(default_lang);
        }
    }

    /// Search for the config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
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

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.server.public_address =
            expand::expand_env(&config.server.public_address, "server.public_address")?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let address = &self.server.public_address;
        if !address.is_empty() {
            require_http_url(address, "server.public_address")?;
        }
        require_non_empty(&self.markdown_resolved.default_lang, "markdown.default_lang")?;
        Ok(())
    }

    /// Resolve the raw markdown section against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.markdown_resolved = MarkdownConfig {
            default_lang: self
                .markdown
                .default_lang
                .clone()
                .unwrap_or_else(|| DEFAULT_LANG.to_owned()),
            strings_dir: self
                .markdown
                .strings_dir
                .as_deref()
                .map(|dir| config_dir.join(dir)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.public_address, "");
        assert_eq!(config.markdown_resolved.default_lang, "en");
        assert_eq!(config.markdown_resolved.strings_dir, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.public_address, "");
        assert_eq!(config.markdown.default_lang, None);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
public_address = "https://blog.example.com"

[markdown]
default_lang = "de"
strings_dir = "strings"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/site"));

        assert_eq!(config.server.public_address, "https://blog.example.com");
        assert_eq!(config.markdown_resolved.default_lang, "de");
        assert_eq!(
            config.markdown_resolved.strings_dir,
            Some(PathBuf::from("/site/strings"))
        );
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        let result: Result<Config, _> = toml::from_str("[server]\npublic_address = 42\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[server]\npublic_address = \"https://example.com\"\n\n[markdown]\nstrings_dir = \"i18n\"\n",
        );

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.server.public_address, "https://example.com");
        assert_eq!(
            config.markdown_resolved.strings_dir,
            Some(dir.path().join("i18n"))
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_load_rejects_non_http_address() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[server]\npublic_address = \"ftp://example.com\"\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("server.public_address"));
    }

    #[test]
    fn test_load_rejects_empty_lang() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[markdown]\ndefault_lang = \"\"\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("markdown.default_lang"));
    }

    #[test]
    fn test_load_expands_env() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("BLOGMARK_TEST_HOST", "posts.example.org");
        }
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[server]\npublic_address = \"https://${BLOGMARK_TEST_HOST}\"\n",
        );
        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.server.public_address, "https://posts.example.org");
        unsafe {
            std::env::remove_var("BLOGMARK_TEST_HOST");
        }
    }

    #[test]
    fn test_load_missing_env_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("BLOGMARK_TEST_UNSET");
        }
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[server]\npublic_address = \"${BLOGMARK_TEST_UNSET}\"\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "server.public_address"));
    }

    #[test]
    fn test_cli_settings_override() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[server]\npublic_address = \"https://example.com\"\n\n[markdown]\ndefault_lang = \"fr\"\n",
        );
        let settings = CliSettings {
            public_address: Some("https://staging.example.com".to_owned()),
            default_lang: None,
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.server.public_address, "https://staging.example.com");
        assert_eq!(config.markdown_resolved.default_lang, "fr");
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let settings = CliSettings {
            public_address: Some("example.com".to_owned()),
            default_lang: None,
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let nested = dir.path().join("posts/2024");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_config(&nested), Some(path));
    }

    #[test]
    fn test_discover_config_none() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("empty");
        fs::create_dir_all(&nested).unwrap();
        let found = Config::discover_config(&nested);
        // A blogmark.toml above the temp dir would be found too.
        assert!(found.is_none_or(|p| !p.starts_with(dir.path())));
    }
}
