//! The sync log: one line per event, readable without any tooling.
//!
//! ```text
//! [2024-06-10 12:00:00] INFO: sync_iot_data: -----SYNC DATA START-----
//! [2024-06-10 12:00:00] WARNING: sync_iot_data: sync pass took 20 seconds ...
//! ```
//!
//! Timestamps are local wall-clock time at second precision.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime, TimeDelta};

use moldsync_core::Severity;

use crate::error::{io_err, DaemonError};
use crate::log_rotation::{self, max_log_age, TIMESTAMP_FORMAT};

/// Default `<context>` segment of every line.
pub const DEFAULT_CONTEXT: &str = "sync_iot_data";

/// Append-only event log with an age-based retention policy.
pub trait LogSink: Send + Sync {
    fn record(&self, severity: Severity, message: &str) -> Result<(), DaemonError>;

    /// Apply the retention policy. Returns `true` if the store was reclaimed.
    fn rotate_if_stale(&self) -> Result<bool, DaemonError>;
}

/// Render one log line, newline included.
pub fn format_line(at: NaiveDateTime, severity: Severity, context: &str, message: &str) -> String {
    format!(
        "[{}] {}: {context}: {message}\n",
        at.format(TIMESTAMP_FORMAT),
        severity.label()
    )
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
    context: String,
    max_age: TimeDelta,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            context: DEFAULT_CONTEXT.to_string(),
            max_age: max_log_age(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_max_age(mut self, max_age: TimeDelta) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line stamped with `at`.
    pub fn record_at(
        &self,
        at: NaiveDateTime,
        severity: Severity,
        message: &str,
    ) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let line = format_line(at, severity, &self.context, message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        // One write per line keeps lines from concurrent daemons whole.
        file.write_all(line.as_bytes())
            .map_err(|e| io_err(&self.path, e))
    }

    pub fn rotate_if_stale_at(&self, now: NaiveDateTime) -> Result<bool, DaemonError> {
        log_rotation::rotate_if_stale(&self.path, now, self.max_age)
            .map_err(|e| io_err(&self.path, e))
    }
}

impl LogSink for FileLogSink {
    fn record(&self, severity: Severity, message: &str) -> Result<(), DaemonError> {
        self.record_at(Local::now().naive_local(), severity, message)
    }

    fn rotate_if_stale(&self) -> Result<bool, DaemonError> {
        let rotated = self.rotate_if_stale_at(Local::now().naive_local())?;
        if rotated {
            tracing::info!(path = %self.path.display(), "sync log reclaimed");
        }
        Ok(rotated)
    }
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryLogState {
    records: Vec<(Severity, String)>,
    rotations: usize,
    failing: bool,
}

/// Collects records for assertions. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    state: Arc<Mutex<MemoryLogState>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<(Severity, String)> {
        self.lock().records.clone()
    }

    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .records
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.messages(severity).iter().any(|m| m.contains(needle))
    }

    pub fn rotations(&self) -> usize {
        self.lock().rotations
    }

    /// Make every subsequent write fail, as a full disk would.
    pub fn fail_writes(&self) {
        self.lock().failing = true;
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, severity: Severity, message: &str) -> Result<(), DaemonError> {
        let mut state = self.lock();
        if state.failing {
            return Err(DaemonError::LogSink("memory sink refuses writes".into()));
        }
        state.records.push((severity, message.to_string()));
        Ok(())
    }

    fn rotate_if_stale(&self) -> Result<bool, DaemonError> {
        self.lock().rotations += 1;
        Ok(false)
    }
}
