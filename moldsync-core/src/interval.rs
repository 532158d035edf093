//! `SYNC_DATA_INTERVAL` resolution.
//!
//! The interval is read again at the start of every cycle so an operator can
//! retune pacing by editing the environment file, without a restart. A
//! missing key or a value that is not a non-negative integer resolves to
//! [`SyncInterval::ZERO`].

use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::types::SyncInterval;

/// Configuration key holding the interval in seconds.
pub const INTERVAL_KEY: &str = "SYNC_DATA_INTERVAL";

/// Anything that can produce the interval for the next cycle.
pub trait IntervalSource: Send + Sync {
    fn resolve(&self) -> SyncInterval;
}

/// A constant interval. Useful for `once` runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub SyncInterval);

impl IntervalSource for FixedInterval {
    fn resolve(&self) -> SyncInterval {
        self.0
    }
}

/// Reads [`INTERVAL_KEY`] from a dotenv-style file on every call.
///
/// When the file does not define the key, the value the process environment
/// held at construction is used before falling back to zero. Construct this
/// before loading the same file into the environment, or the file's own
/// startup value becomes its fallback.
#[derive(Debug, Clone)]
pub struct EnvFileInterval {
    path: PathBuf,
    fallback: Option<String>,
}

impl EnvFileInterval {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: env::var(INTERVAL_KEY).ok(),
        }
    }

    /// Ignore the process environment; only the file counts.
    pub fn file_only(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IntervalSource for EnvFileInterval {
    fn resolve(&self) -> SyncInterval {
        let raw = read_key(&self.path, INTERVAL_KEY).or_else(|| self.fallback.clone());

        match raw {
            Some(value) => parse_interval(&value).unwrap_or_else(|| {
                tracing::warn!("{INTERVAL_KEY}={value:?} is not a whole number of seconds; using 0");
                SyncInterval::ZERO
            }),
            None => SyncInterval::ZERO,
        }
    }
}

/// Parse the textual value of the interval key.
pub fn parse_interval(value: &str) -> Option<SyncInterval> {
    value.trim().parse::<u64>().ok().map(SyncInterval::from_secs)
}

/// Look up `key` in the env file at `path`. The last definition wins;
/// malformed lines are skipped.
pub fn read_key(path: &Path, key: &str) -> Option<String> {
    let iter = match dotenv::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenv::Error::Io(err)) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!("cannot read {}: {err}", path.display());
            return None;
        }
    };

    let mut found = None;
    for item in iter {
        match item {
            Ok((k, v)) if k == key => found = Some(v),
            Ok(_) => {}
            Err(err) => tracing::debug!("skipping line in {}: {err}", path.display()),
        }
    }
    found
}
