//! The cycle loop.
//!
//! One cycle:
//!
//! 1. `START` line, resolve the interval, note the start instant.
//! 2. Marker held elsewhere → [`CycleOutcome::ContentionSkipped`], pause the
//!    full interval. No pass, no `END` line.
//! 3. Otherwise hold the marker for the duration of one pass and release it
//!    whatever the pass did.
//! 4. Pace: sleep `interval - elapsed` when the pass was quicker than the
//!    interval, otherwise warn and start over at once. A failed pass always
//!    costs the full interval.
//! 5. `END` line, then the log retention check.
//!
//! Pass failures are values ([`CycleOutcome::RecoverableError`]). Only the
//! guard and the log sink can fail a cycle with [`DaemonError`], which stops
//! the loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use moldsync_core::{IntervalSource, Severity, SyncInterval};
use moldsync_sync::{PassReport, SyncPass};

use crate::error::DaemonError;
use crate::guard::ExclusionGuard;
use crate::log_sink::LogSink;

pub const START_BANNER: &str = "-----SYNC DATA START-----";
pub const END_BANNER: &str = "-----SYNC DATA END-----";
pub const CONTENTION_MESSAGE: &str = "another instance is already running";

/// What one cycle did, and therefore how long to wait before the next one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The pass finished inside the interval; the remainder is slept.
    Completed {
        interval: SyncInterval,
        elapsed_secs: u64,
        sleep_secs: u64,
        report: PassReport,
    },
    /// The pass took at least the whole interval; no sleep.
    Overran {
        interval: SyncInterval,
        elapsed_secs: u64,
        report: PassReport,
    },
    /// The marker was held by someone else; the pass did not run.
    ContentionSkipped { interval: SyncInterval },
    /// The pass failed; the full interval is slept before retrying.
    RecoverableError {
        interval: SyncInterval,
        message: String,
    },
}

impl CycleOutcome {
    /// Pause before the next cycle starts.
    pub fn pause(&self) -> Duration {
        match self {
            CycleOutcome::Completed { sleep_secs, .. } => Duration::from_secs(*sleep_secs),
            CycleOutcome::Overran { .. } => Duration::ZERO,
            CycleOutcome::ContentionSkipped { interval }
            | CycleOutcome::RecoverableError { interval, .. } => interval.as_duration(),
        }
    }

    pub fn ran_pass(&self) -> bool {
        !matches!(self, CycleOutcome::ContentionSkipped { .. })
    }

    pub fn report(&self) -> Option<&PassReport> {
        match self {
            CycleOutcome::Completed { report, .. } | CycleOutcome::Overran { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CycleOutcome::Completed { .. } => "completed",
            CycleOutcome::Overran { .. } => "overran",
            CycleOutcome::ContentionSkipped { .. } => "contention",
            CycleOutcome::RecoverableError { .. } => "error",
        }
    }
}

/// Whole seconds a pass took, rounded to nearest and never below one.
pub fn elapsed_secs(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64().round() as u64).max(1)
}

/// Seconds left to sleep, or `None` when the pass used up the interval.
pub fn remaining_secs(interval: SyncInterval, elapsed_secs: u64) -> Option<u64> {
    interval
        .as_secs()
        .checked_sub(elapsed_secs)
        .filter(|remaining| *remaining > 0)
}

/// Totals over a run of cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub passes: u64,
    pub contention: u64,
    pub failures: u64,
    pub overruns: u64,
}

impl RunSummary {
    fn count(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Completed { .. } => self.passes += 1,
            CycleOutcome::Overran { .. } => {
                self.passes += 1;
                self.overruns += 1;
            }
            CycleOutcome::ContentionSkipped { .. } => self.contention += 1,
            CycleOutcome::RecoverableError { .. } => self.failures += 1,
        }
    }
}

pub struct Scheduler {
    pass: Arc<dyn SyncPass>,
    guard: Arc<dyn ExclusionGuard>,
    sink: Arc<dyn LogSink>,
    interval: Arc<dyn IntervalSource>,
}

impl Scheduler {
    pub fn new(
        pass: Arc<dyn SyncPass>,
        guard: Arc<dyn ExclusionGuard>,
        sink: Arc<dyn LogSink>,
        interval: Arc<dyn IntervalSource>,
    ) -> Self {
        Self {
            pass,
            guard,
            sink,
            interval,
        }
    }

    fn log(&self, severity: Severity, message: &str) -> Result<(), DaemonError> {
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
        self.sink.record(severity, message)
    }

    /// Run one cycle without sleeping afterwards.
    ///
    /// # Errors
    /// Only guard and log sink failures; a failing pass is
    /// [`CycleOutcome::RecoverableError`].
    pub async fn run_cycle(&self) -> Result<CycleOutcome, DaemonError> {
        self.log(Severity::Info, START_BANNER)?;
        let interval = self.interval.resolve();
        self.log(Severity::Info, &format!("sync interval: {interval}"))?;
        let started = Instant::now();

        if !self.guard.try_acquire()? {
            self.log(Severity::Error, CONTENTION_MESSAGE)?;
            return Ok(CycleOutcome::ContentionSkipped { interval });
        }

        let result = self.run_pass().await;
        self.guard.release()?;

        let outcome = match result {
            Ok(report) => {
                self.log(Severity::Info, &report.summary())?;
                let elapsed = elapsed_secs(started.elapsed());
                match remaining_secs(interval, elapsed) {
                    Some(sleep_secs) => {
                        self.log(
                            Severity::Info,
                            &format!(
                                "sync pass finished in {elapsed} seconds, next run in {sleep_secs} seconds"
                            ),
                        )?;
                        CycleOutcome::Completed {
                            interval,
                            elapsed_secs: elapsed,
                            sleep_secs,
                            report,
                        }
                    }
                    None => {
                        self.log(
                            Severity::Warning,
                            &format!(
                                "sync pass took {elapsed} seconds, not less than the {interval} interval; next run starts now"
                            ),
                        )?;
                        CycleOutcome::Overran {
                            interval,
                            elapsed_secs: elapsed,
                            report,
                        }
                    }
                }
            }
            Err(message) => {
                self.log(Severity::Error, &message)?;
                CycleOutcome::RecoverableError { interval, message }
            }
        };

        self.log(Severity::Info, END_BANNER)?;
        self.sink.rotate_if_stale()?;
        Ok(outcome)
    }

    /// The pass runs on its own task so a panic inside it surfaces here as a
    /// failed pass instead of unwinding past the marker release.
    async fn run_pass(&self) -> Result<PassReport, String> {
        let pass = Arc::clone(&self.pass);
        match tokio::spawn(async move { pass.run().await }).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(err)) => Err(err.to_string()),
            Err(join) if join.is_panic() => Err(format!("sync pass panicked: {join}")),
            Err(join) => Err(format!("sync pass was cancelled: {join}")),
        }
    }

    /// Loop until `shutdown` fires or `max_cycles` cycles have run.
    ///
    /// Shutdown is observed between cycles and during the pause; a pass in
    /// flight always runs to completion. The pause after the final cycle of a
    /// bounded run is skipped.
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        max_cycles: Option<u64>,
    ) -> Result<RunSummary, DaemonError> {
        let mut summary = RunSummary::default();

        while !shutdown.is_cancelled() {
            let outcome = self.run_cycle().await?;
            summary.count(&outcome);
            tracing::debug!(outcome = outcome.kind(), cycle = summary.cycles, "cycle finished");

            if max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            let pause = outcome.pause();
            if pause.is_zero() {
                // Keep an unpaced loop cancellable.
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        if shutdown.is_cancelled() {
            tracing::info!(cycles = summary.cycles, "shutdown requested, sync loop stopped");
        }
        Ok(summary)
    }
}
