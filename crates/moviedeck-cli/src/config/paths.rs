//! Config directory resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Resolves the config directory.
///
/// - If `dir` is `Some`, returns `{dir}`.
/// - Otherwise returns `~/.config/moviedeck`.
fn resolve_config_dir(dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.to_path_buf());
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home).join(".config").join("moviedeck"))
}

/// Resolves the config file path (`config.toml` in the config directory).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&Path>) -> Result<PathBuf> {
    Ok(resolve_config_dir(dir)?.join("config.toml"))
}

/// Resolves the session file path (`session.toml` next to `config.toml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_session_path(dir: Option<&Path>) -> Result<PathBuf> {
    Ok(resolve_config_dir(dir)?.join("session.toml"))
}

/// Resolves the log file used while the browser owns the terminal.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_log_path(dir: Option<&Path>) -> Result<PathBuf> {
    Ok(resolve_config_dir(dir)?.join("moviedeck.log"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_resolve_with_dir() {
        // Arrange
        let dir = PathBuf::from("/tmp/myproject");

        // Act
        let config = resolve_config_path(Some(&dir)).unwrap();
        let session = resolve_session_path(Some(&dir)).unwrap();
        let log = resolve_log_path(Some(&dir)).unwrap();

        // Assert
        assert_eq!(config, PathBuf::from("/tmp/myproject/config.toml"));
        assert_eq!(session, PathBuf::from("/tmp/myproject/session.toml"));
        assert_eq!(log, PathBuf::from("/tmp/myproject/moviedeck.log"));
    }

    #[test]
    fn test_resolve_default() {
        // Arrange & Act
        let path = resolve_config_path(None).unwrap();

        // Assert
        assert!(path.ends_with(".config/moviedeck/config.toml"));
    }
}
