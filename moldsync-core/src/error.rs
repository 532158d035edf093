//! Error types for moldsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or resolving runtime paths.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment file exists but could not be read or parsed.
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    /// A required key was found neither in the environment file nor in the
    /// process environment.
    #[error("missing required configuration key {key}")]
    MissingKey { key: &'static str },

    /// `dirs::home_dir()` returned `None` and no runtime root was configured.
    #[error("cannot determine home directory; set $HOME or MOLDSYNC_HOME")]
    HomeNotFound,
}
