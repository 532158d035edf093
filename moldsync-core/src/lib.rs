//! moldsync core library: domain types, fixed schema, configuration, paths.
//!
//! - [`types`]: source rows, mapped counters, interval, log severity
//! - [`schema`]: table and column names of the fixed projection
//! - [`config`]: startup settings from the environment file
//! - [`interval`]: hot-reloaded `SYNC_DATA_INTERVAL` resolution
//! - [`paths`]: runtime directory layout
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod interval;
pub mod paths;
pub mod schema;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use interval::{EnvFileInterval, FixedInterval, IntervalSource, INTERVAL_KEY};
pub use types::{Severity, SourceRecord, SyncInterval, TargetCounters};
