//! Session file written by `moviedeck login`.

use std::path::Path;

use anyhow::{Context, Result};

use moviedeck_api::store::UserSession;

/// Loads the session. Returns `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_session(path: &Path) -> Result<Option<UserSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let session = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(session))
}

/// Saves the session, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directory creation or file write fails.
pub fn save_session(path: &Path, session: &UserSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let content =
        toml::to_string_pretty(session).context("failed to serialize session to TOML")?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Removes the session file. Returns `false` if there was none.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_session(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)
        .with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(true)
}
