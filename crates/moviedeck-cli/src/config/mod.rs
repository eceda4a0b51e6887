//! Application configuration module.
//!
//! Manages the TOML config file (API endpoint, language, cache tuning) and
//! the session file written by `moviedeck login`.

#[allow(clippy::module_inception)]
mod config;
mod paths;
mod session;

pub use config::AppConfig;
pub use paths::{resolve_config_path, resolve_log_path, resolve_session_path};
pub use session::{load_session, remove_session, save_session};
