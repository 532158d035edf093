//! Process entry for the sync daemon: wiring, signals, one-shot helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use moldsync_core::{paths, EnvFileInterval, IntervalSource, Settings};
use moldsync_sync::pipeline;

use crate::error::{io_err, DaemonError};
use crate::guard::{ExclusionGuard, FileGuard};
use crate::log_sink::{FileLogSink, DEFAULT_CONTEXT};
use crate::scheduler::{CycleOutcome, Scheduler};

/// Where a daemon process keeps its state and finds its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    /// Runtime root holding `run/` and `logs/`.
    pub root: PathBuf,
    /// Env file with database URLs and `SYNC_DATA_INTERVAL`.
    pub env_file: PathBuf,
    /// `<context>` segment of sync log lines.
    pub context: String,
}

impl DaemonOptions {
    pub fn new(root: impl Into<PathBuf>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            env_file: env_file.into(),
            context: DEFAULT_CONTEXT.to_string(),
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        paths::lock_path(&self.root)
    }

    pub fn log_path(&self) -> PathBuf {
        paths::log_path(&self.root)
    }
}

/// Start the daemon and block the current thread until it exits.
///
/// The loop is sequential, so a single-threaded runtime is enough.
pub fn start_blocking(options: &DaemonOptions) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(options.clone()))
}

/// Run the sync loop until ctrl-c / SIGTERM, or until a fatal error.
pub async fn run(options: DaemonOptions) -> Result<(), DaemonError> {
    let scheduler = build_scheduler(&options)?;
    tracing::info!(
        root = %options.root.display(),
        env_file = %options.env_file.display(),
        "sync daemon starting"
    );

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(watch_signals(shutdown.clone()));

    let result = scheduler.run(shutdown.clone(), None).await;
    shutdown.cancel();
    match signals.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "signal handler exited with error"),
        Err(err) => tracing::warn!(error = %err, "signal handler task failed"),
    }

    let summary = result?;
    tracing::info!(
        cycles = summary.cycles,
        passes = summary.passes,
        contention = summary.contention,
        failures = summary.failures,
        "sync daemon stopped"
    );
    Ok(())
}

/// Run exactly one cycle against the configured databases, without pausing.
pub async fn run_once(options: DaemonOptions) -> Result<CycleOutcome, DaemonError> {
    build_scheduler(&options)?.run_cycle().await
}

/// Remove a lock marker left behind by a crashed process.
///
/// Returns whether a marker was present.
pub fn unlock(root: &Path) -> Result<bool, DaemonError> {
    let guard = FileGuard::new(paths::lock_path(root));
    let held = guard.is_held()?;
    guard.release()?;
    if held {
        tracing::info!(path = %guard.path().display(), "lock marker removed");
    }
    Ok(held)
}

fn build_scheduler(options: &DaemonOptions) -> Result<Scheduler, DaemonError> {
    ensure_runtime_dirs(&options.root)?;
    // Snapshot the fallback before the env file is loaded into the process.
    let interval = EnvFileInterval::new(&options.env_file);
    let settings = Settings::load(&options.env_file)?;
    let engine = pipeline::connect_lazy(&settings)?;

    if interval.resolve().is_zero() {
        tracing::warn!(
            "SYNC_DATA_INTERVAL is missing, zero or not a whole number; cycles will run back to back"
        );
    }

    Ok(Scheduler::new(
        Arc::new(engine),
        Arc::new(FileGuard::new(options.lock_path())),
        Arc::new(FileLogSink::new(options.log_path()).with_context(options.context.clone())),
        Arc::new(interval),
    ))
}

async fn watch_signals(shutdown: CancellationToken) -> Result<(), DaemonError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())
            .map_err(|e| DaemonError::Signal(format!("SIGTERM handler: {e}")))?;
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = term.recv() => {
                tracing::info!("received SIGTERM, stopping after the current cycle");
                shutdown.cancel();
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| DaemonError::Signal(format!("ctrl-c handler: {e}")))?;
                tracing::info!("received ctrl-c, stopping after the current cycle");
                shutdown.cancel();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| DaemonError::Signal(format!("ctrl-c handler: {e}")))?;
                tracing::info!("received ctrl-c, stopping after the current cycle");
                shutdown.cancel();
            }
        }
    }

    Ok(())
}

fn ensure_runtime_dirs(root: &Path) -> Result<(), DaemonError> {
    for dir in [paths::run_dir(root), paths::logs_dir(root)] {
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    Ok(())
}

/// Install the process-wide `tracing` subscriber.
///
/// `RUST_LOG` overrides the default `info` filter; `MOLDSYNC_LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("MOLDSYNC_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        fmt().with_env_filter(filter).with_target(false).json().try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}
