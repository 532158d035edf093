//! Startup configuration loaded from the environment file.
//!
//! Only the database URLs are read here, once, at process start. The sync
//! interval is deliberately not part of [`Settings`]; see [`crate::interval`].

use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const SOURCE_URL_KEY: &str = "MOLDSYNC_SOURCE_URL";
pub const TARGET_URL_KEY: &str = "MOLDSYNC_TARGET_URL";

/// Default env file, relative to the working directory.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Database endpoints for one daemon process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub env_file: PathBuf,
    pub source_url: String,
    pub target_url: String,
}

impl Settings {
    /// Load `env_file` into the process environment (existing variables win)
    /// and read both database URLs.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        load_env_file(env_file)?;
        Ok(Self {
            env_file: env_file.to_path_buf(),
            source_url: require(SOURCE_URL_KEY)?,
            target_url: require(TARGET_URL_KEY)?,
        })
    }
}

/// Load `env_file` and read only the source database URL, for commands that
/// never touch the target.
pub fn load_source_url(env_file: &Path) -> Result<String, ConfigError> {
    load_env_file(env_file)?;
    require(SOURCE_URL_KEY)
}

/// Load an env file into the process environment.
///
/// Returns `Ok(false)` if the file does not exist.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenv::from_path(path) {
        Ok(()) => {
            tracing::info!("loaded environment from {}", path.display());
            Ok(true)
        }
        Err(dotenv::Error::Io(err)) if err.kind() == ErrorKind::NotFound => {
            tracing::info!("no environment file at {}", path.display());
            Ok(false)
        }
        Err(source) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a required, non-empty variable from the process environment.
pub fn require(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingKey { key }),
    }
}
