//! `AppConfig` struct and TOML read/write.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use moviedeck_api::tmdb::DEFAULT_BASE_URL;

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// TMDB API settings.
    #[serde(default)]
    pub tmdb: TmdbConfig,
    /// Query cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// TMDB API configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TmdbConfig {
    /// API base URL. A missing trailing `/` is added when parsed.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Response language.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
        }
    }
}

impl TmdbConfig {
    /// Parses the configured base URL, ending its path with `/` so
    /// endpoint paths join below it.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid tmdb.base_url: {}", self.base_url))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Query cache configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Seconds an unused response stays cached.
    #[serde(default = "default_keep_unused_secs")]
    pub keep_unused_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_secs: default_keep_unused_secs(),
        }
    }
}

impl CacheConfig {
    /// Keep-unused duration for the query cache.
    #[must_use]
    pub const fn keep_unused_for(&self) -> Duration {
        Duration::from_secs(self.keep_unused_secs)
    }
}

fn default_base_url() -> String {
    String::from(DEFAULT_BASE_URL)
}

fn default_language() -> String {
    String::from("en-US")
}

const fn default_keep_unused_secs() -> u64 {
    60
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_config() {
        // Arrange & Act
        let config = AppConfig::default();

        // Assert
        assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3/");
        assert_eq!(config.tmdb.language, "en-US");
        assert_eq!(config.cache.keep_unused_for(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            tmdb: TmdbConfig {
                base_url: String::from("http://localhost:8080/3/"),
                language: String::from("ja-JP"),
            },
            cache: CacheConfig {
                keep_unused_secs: 5,
            },
        };

        // Act
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_config() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tmdb]\nlanguage = \"fr-FR\"\n").unwrap();

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config.tmdb.language, "fr-FR");
        assert_eq!(config.tmdb.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_invalid_base_url() {
        // Arrange
        let config = TmdbConfig {
            base_url: String::from("not a url"),
            language: default_language(),
        };

        // Act
        let result = config.parsed_base_url();

        // Assert
        assert!(result.unwrap_err().to_string().contains("tmdb.base_url"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        // Arrange
        let config = TmdbConfig {
            base_url: String::from("https://api.themoviedb.org/3"),
            language: default_language(),
        };

        // Act
        let url = config.parsed_base_url().unwrap();

        // Assert
        assert_eq!(url.as_str(), "https://api.themoviedb.org/3/");
        assert_eq!(
            url.join("movie/popular").unwrap().as_str(),
            "https://api.themoviedb.org/3/movie/popular"
        );
    }
}
