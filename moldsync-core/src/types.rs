//! Domain types shared by the sync engine and the daemon.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Minimum wall-clock spacing between cycle starts, in whole seconds.
///
/// Zero means "no pacing": every cycle overruns and the next one starts
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SyncInterval(pub u64);

impl SyncInterval {
    pub const ZERO: SyncInterval = SyncInterval(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} seconds", self.0)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a log sink record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Upper-case label used in the log line.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!(
                "unknown severity '{other}'; expected: info, warning, error"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One row of the mold master table.
///
/// Every column is nullable upstream; a row without a serial can never match
/// an asset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    pub mold_serial: Option<String>,
    pub maintenance_shot: Option<i64>,
    pub scrap_qty: Option<i64>,
    pub scrap_shot: Option<i64>,
    pub machine_cd: Option<String>,
}

impl SourceRecord {
    /// Convenience constructor for a fully populated counter row.
    pub fn new(mold_serial: impl Into<String>, maintenance_shot: i64, scrap_qty: i64, scrap_shot: i64) -> Self {
        Self {
            mold_serial: Some(mold_serial.into()),
            maintenance_shot: Some(maintenance_shot),
            scrap_qty: Some(scrap_qty),
            scrap_shot: Some(scrap_shot),
            machine_cd: None,
        }
    }

    /// Project this row onto the asset custom-field slots.
    pub fn counters(&self) -> TargetCounters {
        TargetCounters {
            maintenance_shot_24: self.maintenance_shot,
            scrap_shot_26: self.scrap_qty,
            shot_qty_25: self.scrap_shot,
        }
    }
}

/// Values written into an asset's three mapped slots.
///
/// Field names follow the target column labels, not the source semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetCounters {
    /// `_snipeit_maintenance_shot_24` ← `maintenance_shot`
    pub maintenance_shot_24: Option<i64>,
    /// `_snipeit_scrap_shot_26` ← `scrap_qty`
    pub scrap_shot_26: Option<i64>,
    /// `_snipeit_shot_qty_25` ← `scrap_shot`
    pub shot_qty_25: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
