use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use moldsync_core::{EnvFileInterval, SourceRecord};
use moldsync_daemon::scheduler::{CONTENTION_MESSAGE, END_BANNER, START_BANNER};
use moldsync_daemon::{CycleOutcome, ExclusionGuard, FileGuard, FileLogSink, Scheduler};
use moldsync_sync::{MemorySource, MemoryTarget, SyncEngine};

struct Fixture {
    _dir: TempDir,
    lock: std::path::PathBuf,
    log: std::path::PathBuf,
    env: std::path::PathBuf,
    target: MemoryTarget,
}

fn fixture(interval: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let env = dir.path().join("daemon.env");
    fs::write(&env, format!("SYNC_DATA_INTERVAL={interval}\n")).unwrap();
    Fixture {
        lock: dir.path().join("run").join("sync-data.lock"),
        log: dir.path().join("logs").join("sync-data.log"),
        env,
        target: MemoryTarget::new(),
        _dir: dir,
    }
}

fn scheduler(fx: &Fixture, rows: Vec<SourceRecord>) -> Scheduler {
    Scheduler::new(
        Arc::new(SyncEngine::new(MemorySource::new(rows), fx.target.clone())),
        Arc::new(FileGuard::new(&fx.lock)),
        Arc::new(FileLogSink::new(&fx.log)),
        Arc::new(EnvFileInterval::new(&fx.env).file_only()),
    )
}

/// Log lines with the bracketed timestamp stripped.
fn bodies(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap()
        .lines()
        .map(|l| l.split_once("] ").map(|(_, b)| b.to_string()).unwrap_or_default())
        .collect()
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn cycle_writes_bracketed_log_and_releases_marker() {
    let fx = fixture("15");
    let id = fx.target.insert_asset("M1");
    let sched = scheduler(&fx, vec![SourceRecord::new("M1", 5, 2, 1)]);

    let outcome = sched.run_cycle().await.unwrap();

    assert!(matches!(outcome, CycleOutcome::Completed { sleep_secs: 14, .. }));
    assert!(!fx.lock.exists(), "marker must be gone after the pass");
    let counters = fx.target.counters(id).unwrap();
    assert_eq!(counters.shot_qty_25, Some(1));

    let lines = bodies(&fx.log);
    assert_eq!(lines.first().unwrap(), &format!("INFO: sync_iot_data: {START_BANNER}"));
    assert_eq!(lines[1], "INFO: sync_iot_data: sync interval: 15 seconds");
    assert_eq!(lines.last().unwrap(), &format!("INFO: sync_iot_data: {END_BANNER}"));
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn leftover_marker_blocks_every_cycle() {
    let fx = fixture("15");
    fx.target.insert_asset("M1");
    let stale = FileGuard::new(&fx.lock);
    assert!(stale.try_acquire().unwrap());

    let sched = scheduler(&fx, vec![SourceRecord::new("M1", 5, 2, 1)]);
    let summary = sched.run(CancellationToken::new(), Some(3)).await.unwrap();

    assert_eq!(summary.contention, 3);
    assert_eq!(summary.passes, 0);
    assert_eq!(fx.target.mutations(), 0);
    assert!(fx.lock.exists(), "a skipped cycle must not remove someone else's marker");

    let lines = bodies(&fx.log);
    let errors = lines
        .iter()
        .filter(|l| *l == &format!("ERROR: sync_iot_data: {CONTENTION_MESSAGE}"))
        .count();
    assert_eq!(errors, 3);
    assert!(!lines.iter().any(|l| l.ends_with(END_BANNER)));
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn two_daemons_sharing_a_marker_run_one_pass() {
    let fx = fixture("15");
    fx.target.insert_asset("M1");
    let a = scheduler(&fx, vec![SourceRecord::new("M1", 5, 2, 1)]);
    let b = scheduler(&fx, vec![SourceRecord::new("M1", 5, 2, 1)]);

    // `a` holds the marker while its pass is parked on the spawned task.
    let (first, second) = tokio::join!(a.run_cycle(), b.run_cycle());
    let ran = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|o| o.ran_pass())
        .count();

    assert_eq!(ran, 1);
    assert_eq!(fx.target.mutations(), 1);
    assert!(!fx.lock.exists());
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn interval_edit_applies_on_next_cycle() {
    let fx = fixture("15");
    let sched = scheduler(&fx, Vec::new());

    let before = sched.run_cycle().await.unwrap();
    fs::write(&fx.env, "SYNC_DATA_INTERVAL=60\n").unwrap();
    let after = sched.run_cycle().await.unwrap();

    assert_eq!(before.pause(), Duration::from_secs(14));
    assert_eq!(after.pause(), Duration::from_secs(59));
    assert!(bodies(&fx.log).contains(&"INFO: sync_iot_data: sync interval: 60 seconds".to_string()));
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn target_outage_is_logged_and_retried_after_full_interval() {
    let fx = fixture("30");
    fx.target.insert_asset("M1");
    fx.target.set_unavailable(true);
    let sched = scheduler(&fx, vec![SourceRecord::new("M1", 5, 2, 1)]);

    let outcome = sched.run_cycle().await.unwrap();

    assert!(matches!(outcome, CycleOutcome::RecoverableError { .. }));
    assert_eq!(outcome.pause(), Duration::from_secs(30));
    assert!(!fx.lock.exists());
    assert!(bodies(&fx.log).iter().any(|l| l.starts_with("ERROR: sync_iot_data: ")));
}
