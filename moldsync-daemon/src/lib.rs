//! Sync daemon runtime: exclusion guard, sync log, cycle scheduler.

mod error;
pub mod guard;
pub mod log_rotation;
pub mod log_sink;
mod runtime;
pub mod scheduler;
pub mod service;

pub use error::DaemonError;
pub use guard::{ExclusionGuard, FileGuard, MemoryGuard};
pub use log_sink::{FileLogSink, LogSink, MemoryLogSink};
pub use runtime::{init_tracing, run, run_once, start_blocking, unlock, DaemonOptions};
pub use scheduler::{CycleOutcome, RunSummary, Scheduler};
pub use service::ServiceSpec;
