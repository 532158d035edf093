//! Storage seams for the two databases a pass touches.

use async_trait::async_trait;

use moldsync_core::{SourceRecord, TargetCounters};

use crate::checkout::MachineAssignment;
use crate::SyncError;

/// The manufacturing database holding the mold master table.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Every row of the mold master table, unfiltered.
    async fn fetch_all(&self) -> Result<Vec<SourceRecord>, SyncError>;

    /// Clear `machine_cd` on every row currently holding it, then assign it
    /// to the row with `mold_serial`.
    async fn reassign_machine_code(
        &self,
        mold_serial: &str,
        machine_cd: &str,
    ) -> Result<MachineAssignment, SyncError>;
}

/// The asset-tracking database.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Overwrite the mapped slots of every live (not soft-deleted) asset
    /// whose serial equals `serial`. Returns the number of rows affected;
    /// zero is not an error.
    async fn apply_counters(&self, serial: &str, counters: &TargetCounters) -> Result<u64, SyncError>;
}
