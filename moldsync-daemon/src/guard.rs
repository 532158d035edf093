//! Cross-process exclusion for sync passes.
//!
//! The marker is advisory and single-host. It carries no fencing token and is
//! never reclaimed automatically: a process killed mid-pass leaves the marker
//! behind and every later cycle reports contention until an operator removes
//! it (`moldsync unlock`).

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{io_err, DaemonError};

/// Non-blocking, non-reentrant mutual exclusion.
pub trait ExclusionGuard: Send + Sync {
    /// Take the marker if nobody holds it. Never waits.
    fn try_acquire(&self) -> Result<bool, DaemonError>;

    /// Drop the marker. Releasing an absent marker is a no-op.
    fn release(&self) -> Result<(), DaemonError>;

    fn is_held(&self) -> Result<bool, DaemonError>;
}

// ---------------------------------------------------------------------------
// File marker
// ---------------------------------------------------------------------------

/// Marker file created with `O_CREAT | O_EXCL`, so of two racing processes
/// exactly one wins.
#[derive(Debug, Clone)]
pub struct FileGuard {
    path: PathBuf,
}

impl FileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExclusionGuard for FileGuard {
    fn try_acquire(&self) -> Result<bool, DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => {
                stamp_marker(&self.path, file)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_err(&self.path, e)),
        }
    }

    fn release(&self) -> Result<(), DaemonError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&self.path, e)),
        }
    }

    fn is_held(&self) -> Result<bool, DaemonError> {
        match fs::symlink_metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&self.path, e)),
        }
    }
}

/// Write the owner stamp into a freshly created marker. On failure the marker
/// is removed again so a restarted daemon does not see phantom contention.
fn stamp_marker(path: &Path, mut file: impl Write) -> Result<(), DaemonError> {
    let stamp = format!(
        "pid={} acquired_at={}\n",
        std::process::id(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if let Err(err) = file.write_all(stamp.as_bytes()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(io_err(path, err));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory marker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryGuardState {
    held: AtomicBool,
    acquisitions: AtomicUsize,
    broken: AtomicBool,
}

/// In-process stand-in for the marker file. Clones share one marker, so two
/// schedulers holding clones behave like two daemons on one host.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuard {
    state: Arc<MemoryGuardState>,
}

impl MemoryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A guard whose marker is already present, as left by a crashed process.
    pub fn held() -> Self {
        let guard = Self::default();
        guard.state.held.store(true, Ordering::SeqCst);
        guard
    }

    /// Successful acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        self.state.acquisitions.load(Ordering::SeqCst)
    }

    /// Make every operation fail, as if the runtime directory vanished.
    pub fn break_marker(&self) {
        self.state.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DaemonError> {
        if self.state.broken.load(Ordering::SeqCst) {
            return Err(DaemonError::Guard("marker storage unavailable".into()));
        }
        Ok(())
    }
}

impl ExclusionGuard for MemoryGuard {
    fn try_acquire(&self) -> Result<bool, DaemonError> {
        self.check()?;
        let won = self
            .state
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.state.acquisitions.fetch_add(1, Ordering::SeqCst);
        }
        Ok(won)
    }

    fn release(&self) -> Result<(), DaemonError> {
        self.check()?;
        self.state.held.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_held(&self) -> Result<bool, DaemonError> {
        self.check()?;
        Ok(self.state.held.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_stamp_leaves_no_marker_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-data.lock");
        fs::write(&path, "").unwrap();

        let err = stamp_marker(&path, FullDisk).unwrap_err();
        assert!(matches!(err, DaemonError::Io { .. }), "got: {err}");
        assert!(!path.exists());
        assert!(FileGuard::new(&path).try_acquire().unwrap());
    }

    #[test]
    fn file_guard_is_exclusive_until_released() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("sync-data.lock");
        let first = FileGuard::new(&path);
        let second = FileGuard::new(&path);

        assert!(first.try_acquire().unwrap());
        assert!(path.exists());
        assert!(!second.try_acquire().unwrap(), "held marker must not be re-acquired");
        assert!(!first.try_acquire().unwrap(), "guard is not reentrant");

        first.release().unwrap();
        assert!(!path.exists());
        assert!(second.try_acquire().unwrap());
    }

    #[test]
    fn releasing_absent_marker_is_noop() {
        let dir = TempDir::new().unwrap();
        let guard = FileGuard::new(dir.path().join("sync-data.lock"));
        guard.release().unwrap();
        guard.release().unwrap();
        assert!(!guard.is_held().unwrap());
    }

    #[test]
    fn marker_records_owner_pid() {
        let dir = TempDir::new().unwrap();
        let guard = FileGuard::new(dir.path().join("sync-data.lock"));
        guard.try_acquire().unwrap();
        let contents = fs::read_to_string(guard.path()).unwrap();
        assert!(contents.starts_with(&format!("pid={}", std::process::id())));
    }

    #[test]
    fn memory_guard_clones_share_one_marker() {
        let a = MemoryGuard::new();
        let b = a.clone();
        assert!(a.try_acquire().unwrap());
        assert!(!b.try_acquire().unwrap());
        a.release().unwrap();
        assert!(b.try_acquire().unwrap());
        assert_eq!(a.acquisitions(), 2);
    }

    #[test]
    fn broken_memory_guard_errors() {
        let guard = MemoryGuard::new();
        guard.break_marker();
        assert!(matches!(guard.try_acquire(), Err(DaemonError::Guard(_))));
    }
}
