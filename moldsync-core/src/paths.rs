//! Runtime directory layout.
//!
//! ```text
//! <root>/                 (default ~/.moldsync, override with MOLDSYNC_HOME)
//!   run/sync-data.lock    lock marker, present while a pass is in flight
//!   logs/sync-data.log    append-only sync log
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const SERVICE_LABEL: &str = "dev.moldsync.sync-data";
pub const SYSTEMD_UNIT: &str = "moldsync-sync-data.service";

pub const ROOT_ENV: &str = "MOLDSYNC_HOME";
pub const LOCK_FILE: &str = "sync-data.lock";
pub const LOG_FILE: &str = "sync-data.log";

/// `$MOLDSYNC_HOME` when set, otherwise `~/.moldsync`.
pub fn resolve_root() -> Result<PathBuf, ConfigError> {
    if let Some(root) = env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_root(&home))
}

pub fn default_root(home: &Path) -> PathBuf {
    home.join(".moldsync")
}

pub fn run_dir(root: &Path) -> PathBuf {
    root.join("run")
}

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join("logs")
}

pub fn lock_path(root: &Path) -> PathBuf {
    run_dir(root).join(LOCK_FILE)
}

pub fn log_path(root: &Path) -> PathBuf {
    logs_dir(root).join(LOG_FILE)
}

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn launchd_plist_path(home: &Path) -> PathBuf {
    launch_agents_dir(home).join(format!("{SERVICE_LABEL}.plist"))
}

pub fn systemd_user_dir(home: &Path) -> PathBuf {
    home.join(".config").join("systemd").join("user")
}

pub fn systemd_unit_path(home: &Path) -> PathBuf {
    systemd_user_dir(home).join(SYSTEMD_UNIT)
}
