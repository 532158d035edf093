//! Source-side effect of checking an asset out to a location.
//!
//! A machine code identifies the machine a mold is mounted on and may be held
//! by at most one mold. Checking asset `serial` out to location `name` moves
//! the code: any row holding `name` is cleared first, then the row for
//! `serial` receives it.

use serde::Serialize;

use crate::store::SourceStore;
use crate::SyncError;

/// Rows touched by a reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MachineAssignment {
    /// Rows whose `machine_cd` was reset to NULL.
    pub cleared: u64,
    /// Rows that received the new `machine_cd`.
    pub assigned: u64,
}

/// Move machine code `location` onto the mold with `mold_serial`.
///
/// An unknown serial is not an error: the code is still cleared from its
/// previous holder and `assigned` is zero.
pub async fn assign_machine_code<S>(
    source: &S,
    mold_serial: &str,
    location: &str,
) -> Result<MachineAssignment, SyncError>
where
    S: SourceStore + ?Sized,
{
    let mold_serial = mold_serial.trim();
    let location = location.trim();
    if mold_serial.is_empty() {
        return Err(SyncError::InvalidInput("asset serial must not be empty".into()));
    }
    if location.is_empty() {
        return Err(SyncError::InvalidInput("location name must not be empty".into()));
    }

    let result = source.reassign_machine_code(mold_serial, location).await?;
    tracing::info!(
        "checkout updated mold master: mold_serial={mold_serial} machine_cd={location} (cleared {}, assigned {})",
        result.cleared,
        result.assigned
    );
    if result.assigned == 0 {
        tracing::warn!("no mold master row has mold_serial={mold_serial}");
    }
    Ok(result)
}
