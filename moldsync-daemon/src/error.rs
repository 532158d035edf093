use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime. Every variant is fatal to the run
/// loop; sync pass failures never reach this type.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] moldsync_core::ConfigError),

    #[error("sync setup error: {0}")]
    Sync(#[from] moldsync_sync::SyncError),

    #[error("lock marker error: {0}")]
    Guard(String),

    #[error("log sink error: {0}")]
    LogSink(String),

    #[error("signal handler failed: {0}")]
    Signal(String),

    #[error("service manager error: {0}")]
    Service(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
