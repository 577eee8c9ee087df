//! Localized UI strings.
//!
//! String tables are flat YAML maps, one file per language:
//!
//! ```yaml
//! # strings/de.yaml
//! alertnote: Hinweis
//! alertwarning: Warnung
//! ```
//!
//! A `default.yaml` in the same directory supplies fallbacks for every
//! language.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Looks up localized strings.
pub trait Localizer: Send + Sync {
    /// String for `key` in `lang`, or an empty string when there is none.
    fn get_string(&self, lang: &str, key: &str) -> String;
}

/// Localizer without any strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStrings;

impl Localizer for NoStrings {
    fn get_string(&self, _lang: &str, _key: &str) -> String {
        String::new()
    }
}

/// Error loading string tables.
#[derive(Debug, thiserror::Error)]
pub enum StringsError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid string table {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

type Table = HashMap<String, String>;

/// In-memory string tables keyed by language.
///
/// Lookup tries the exact language, then its primary subtag (`de-CH` falls
/// back to `de`), then the default table.
#[derive(Debug, Default, Clone)]
pub struct Strings {
    languages: HashMap<String, Table>,
    default: Table,
}

impl Strings {
    /// Default table with English alert titles.
    #[must_use]
    pub fn builtin() -> Self {
        let default = crate::alert::AlertType::ALL
            .into_iter()
            .map(|t| (t.localization_key(), t.default_title().to_owned()))
            .collect();
        Self {
            languages: HashMap::new(),
            default,
        }
    }

    /// Load every `*.yaml`/`*.yml` file in `dir` on top of [`builtin`](Self::builtin).
    ///
    /// The file stem is the language tag; `default` fills the fallback table.
    pub fn load_dir(dir: &Path) -> Result<Self, StringsError> {
        let io_err = |source| StringsError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut strings = Self::builtin();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()
            .map_err(io_err)?;
        paths.sort();

        for path in paths {
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_yaml || !path.is_file() {
                continue;
            }
            let table = Self::load_file(&path)?;
            tracing::debug!(lang, keys = table.len(), path = %path.display(), "Loaded strings");
            let lang = lang.to_owned();
            if lang == "default" {
                strings.default.extend(table);
            } else {
                strings.languages.entry(lang).or_default().extend(table);
            }
        }
        Ok(strings)
    }

    fn load_file(path: &Path) -> Result<Table, StringsError> {
        let content = fs::read_to_string(path).map_err(|source| StringsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Table::new());
        }
        serde_yaml::from_str(&content).map_err(|source| StringsError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set a single string. `lang` of `default` targets the fallback table.
    pub fn insert(&mut self, lang: &str, key: impl Into<String>, value: impl Into<String>) {
        let table = if lang == "default" {
            &mut self.default
        } else {
            self.languages.entry(lang.to_owned()).or_default()
        };
        table.insert(key.into(), value.into());
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        let primary = lang.split(['-', '_']).next().unwrap_or_default();
        [lang, primary]
            .into_iter()
            .filter(|l| !l.is_empty())
            .find_map(|l| self.languages.get(l).and_then(|t| t.get(key)))
            .or_else(|| self.default.get(key))
            .map(String::as_str)
    }
}

impl Localizer for Strings {
    fn get_string(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key).unwrap_or_default().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_no_strings_is_empty() {
        assert_eq!(NoStrings.get_string("en", "alertnote"), "");
    }

    #[test]
    fn test_builtin_titles() {
        let strings = Strings::builtin();
        assert_eq!(strings.get_string("en", "alertnote"), "Note");
        assert_eq!(strings.get_string("de", "alertcaution"), "Caution");
        assert_eq!(strings.get_string("en", "missing"), "");
    }

    #[test]
    fn test_lookup_order() {
        let mut strings = Strings::default();
        strings.insert("default", "k", "default");
        strings.insert("de", "k", "de");
        strings.insert("de-CH", "k", "de-CH");

        assert_eq!(strings.get_string("de-CH", "k"), "de-CH");
        assert_eq!(strings.get_string("de-AT", "k"), "de");
        assert_eq!(strings.get_string("fr", "k"), "default");
        assert_eq!(strings.get_string("", "k"), "default");
    }

    #[test]
    fn test_load_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("de.yaml"), "alertnote: Hinweis\n").unwrap();
        std::fs::write(dir.path().join("default.yml"), "greeting: Hello\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let strings = Strings::load_dir(dir.path()).unwrap();
        assert_eq!(strings.get_string("de", "alertnote"), "Hinweis");
        assert_eq!(strings.get_string("de", "greeting"), "Hello");
        assert_eq!(strings.get_string("en", "alertnote"), "Note");
    }

    #[test]
    fn test_load_dir_empty_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fr.yaml"), "").unwrap();
        let strings = Strings::load_dir(dir.path()).unwrap();
        assert_eq!(strings.get_string("fr", "alerttip"), "Tip");
    }

    #[test]
    fn test_load_dir_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("de.yaml"), "- not\n- a map\n").unwrap();
        let err = Strings::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, StringsError::Yaml { .. }));
        assert!(err.to_string().contains("de.yaml"));
    }

    #[test]
    fn test_load_dir_missing() {
        let dir = TempDir::new().unwrap();
        let err = Strings::load_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, StringsError::Io { .. }));
    }
}
