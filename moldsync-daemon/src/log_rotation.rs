//! Age-based rotation for the sync log.
//!
//! The log is reclaimed whole: once the timestamp on its **first** line is at
//! least `max_age` old, the file is deleted and the next write starts a fresh
//! one. There are no numbered backups.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};

/// Age of the oldest line that triggers deletion.
pub const MAX_LOG_AGE_DAYS: i64 = 2;

pub fn max_log_age() -> TimeDelta {
    TimeDelta::days(MAX_LOG_AGE_DAYS)
}

/// `strftime` format of the bracketed line timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Delete `log_path` if its first line is `max_age` or more older than `now`.
///
/// A first line without a readable timestamp also counts as stale, because
/// the store could otherwise never be reclaimed.
///
/// Returns `true` if the file was deleted, `false` if it was kept, empty, or
/// did not exist.
///
/// # Errors
/// Returns `io::Error` only on unexpected filesystem failures; a missing file
/// is silently skipped.
pub fn rotate_if_stale(log_path: &Path, now: NaiveDateTime, max_age: TimeDelta) -> io::Result<bool> {
    let file = match File::open(log_path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    // Bytes, not `read_line`: a non-UTF-8 first line is garbage, not an error.
    let mut raw = Vec::new();
    BufReader::new(file).read_until(b'\n', &mut raw)?;
    let first = String::from_utf8_lossy(&raw);
    if first.trim().is_empty() {
        return Ok(false);
    }

    let stale = match first_line_timestamp(&first) {
        Some(written) => now - written >= max_age,
        None => true,
    };
    if !stale {
        return Ok(false);
    }

    match fs::remove_file(log_path) {
        Ok(()) => Ok(true),
        // Another daemon on the same host got there first.
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Parse the `[YYYY-MM-DD HH:MM:SS]` prefix of a log line.
pub fn first_line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    NaiveDateTime::parse_from_str(&rest[..end], TIMESTAMP_FORMAT).ok()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn write_log(dir: &TempDir, first: NaiveDateTime, lines: usize) -> std::path::PathBuf {
        let path = dir.path().join("sync-data.log");
        let mut body = String::new();
        for i in 0..lines {
            let at = first + TimeDelta::minutes(i as i64);
            body.push_str(&format!(
                "[{}] INFO: sync: line {i}\n",
                at.format(TIMESTAMP_FORMAT)
            ));
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn two_days_and_one_second_old_store_is_deleted() {
        let dir = TempDir::new().unwrap();
        let first = now() - TimeDelta::days(2) - TimeDelta::seconds(1);
        let log = write_log(&dir, first, 50);

        assert!(rotate_if_stale(&log, now(), max_log_age()).unwrap());
        assert!(!log.exists(), "entire store must be removed");
    }

    #[test]
    fn exactly_two_days_old_store_is_deleted() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, now() - TimeDelta::days(2), 3);
        assert!(rotate_if_stale(&log, now(), max_log_age()).unwrap());
    }

    #[test]
    fn one_day_old_store_is_kept() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, now() - TimeDelta::days(1), 50);

        assert!(!rotate_if_stale(&log, now(), max_log_age()).unwrap());
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 50);
    }

    #[test]
    fn only_first_line_decides() {
        let dir = TempDir::new().unwrap();
        // First line is fresh, a later line is ancient.
        let path = dir.path().join("sync-data.log");
        let fresh = now() - TimeDelta::hours(1);
        let ancient = now() - TimeDelta::days(30);
        fs::write(
            &path,
            format!(
                "[{}] INFO: sync: a\n[{}] INFO: sync: b\n",
                fresh.format(TIMESTAMP_FORMAT),
                ancient.format(TIMESTAMP_FORMAT)
            ),
        )
        .unwrap();
        assert!(!rotate_if_stale(&path, now(), max_log_age()).unwrap());
    }

    #[test]
    fn missing_and_empty_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nonexistent.log");
        assert!(!rotate_if_stale(&missing, now(), max_log_age()).unwrap());

        let empty = dir.path().join("empty.log");
        fs::write(&empty, "").unwrap();
        assert!(!rotate_if_stale(&empty, now(), max_log_age()).unwrap());
        assert!(empty.exists());
    }

    #[test]
    fn garbage_first_line_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-data.log");
        fs::write(&path, "not a log line\n").unwrap();
        assert!(rotate_if_stale(&path, now(), max_log_age()).unwrap());
    }

    #[test]
    fn non_utf8_first_line_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-data.log");
        fs::write(&path, b"\xff\xfe garbage\n[2024-06-10 11:00:00] INFO: sync: later\n").unwrap();
        assert!(rotate_if_stale(&path, now(), max_log_age()).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn timestamp_prefix_parses() {
        assert_eq!(
            first_line_timestamp("[2024-06-10 12:00:00] ERROR: sync: boom"),
            Some(now())
        );
        assert_eq!(first_line_timestamp("2024-06-10 12:00:00 no brackets"), None);
    }
}
