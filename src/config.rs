//! Configuration loading
//!
//! Shows are declared in a TOML file, keyed by the name the release group
//! uses for them:
//!
//! ```toml
//! [shows."Example"]
//! id = 12345
//! name = "Example"
//! mapping = ["E1-12:S1E1-12", "E13-:S2E1-"]
//! ```

use crate::range_map::{RangeMap, ValidationError};
use crate::show::Show;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    /// A show declares an invalid range mapping
    #[error("Invalid mapping for '{show}': {source}")]
    InvalidMapping {
        show: String,
        source: ValidationError,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    shows: BTreeMap<String, RawShow>,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    id: Option<u64>,
    name: Option<String>,
    #[serde(default)]
    mapping: Vec<String>,
}

/// Parsed application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    shows: HashMap<String, Show>,
}

impl Config {
    /// Loads and validates the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), shows = config.shows.len(), "loaded config");
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut shows = HashMap::with_capacity(raw.shows.len());

        for (release_name, raw_show) in raw.shows {
            let mapping = if raw_show.mapping.is_empty() {
                None
            } else {
                let map = RangeMap::from_specs(&raw_show.mapping).map_err(|source| {
                    ConfigError::InvalidMapping {
                        show: release_name.clone(),
                        source,
                    }
                })?;
                Some(map)
            };

            let name = raw_show
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| release_name.clone());

            shows.insert(
                release_name,
                Show {
                    name,
                    catalog_id: raw_show.id,
                    mapping,
                },
            );
        }

        Ok(Self { shows })
    }

    /// Looks up a show by the name used in release filenames
    pub fn show(&self, release_name: &str) -> Option<&Show> {
        self.shows.get(release_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml_str(
            r#"
            [shows."Example"]
            id = 12345
            mapping = ["E1-12:S1E1-12", "E13-:S2E1-"]

            [shows."Release Title"]
            id = 42
            name = "Display Title"
            "#,
        )
        .unwrap();

        let example = config.show("Example").unwrap();
        assert_eq!(example.name, "Example");
        assert_eq!(example.catalog_id, Some(12345));
        assert!(example.mapping.as_ref().unwrap().is_continued());

        let renamed = config.show("Release Title").unwrap();
        assert_eq!(renamed.name, "Display Title");
        assert_eq!(renamed.mapping, None);

        assert!(config.show("Display Title").is_none());
    }

    #[test]
    fn test_show_without_id() {
        let config = Config::from_toml_str("[shows.Plain]\n").unwrap();
        assert_eq!(config.show("Plain").unwrap().catalog_id, None);
    }

    #[test]
    fn test_invalid_mapping_names_show() {
        let err = Config::from_toml_str(
            r#"
            [shows."Broken"]
            id = 1
            mapping = ["E1-12:S1E1-12", "E5-6:S2E1-2"]
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::InvalidMapping { show, source } => {
                assert_eq!(show, "Broken");
                assert!(matches!(source, ValidationError::OutOfOrder { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("[shows"),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("config.toml")),
            Err(ConfigError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[shows.\"Example\"]\nid = 7\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().show("Example").unwrap().catalog_id, Some(7));
    }
}
