//! In-memory stores with fault injection, for tests and dry runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use moldsync_core::{SourceRecord, TargetCounters};

use crate::checkout::MachineAssignment;
use crate::store::{SourceStore, TargetStore};
use crate::SyncError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SourceState {
    rows: Vec<SourceRecord>,
    unavailable: bool,
    fetches: usize,
}

/// Mold master table held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub fn new(rows: Vec<SourceRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                rows,
                ..Default::default()
            })),
        }
    }

    pub fn rows(&self) -> Vec<SourceRecord> {
        lock(&self.state).rows.clone()
    }

    pub fn replace_rows(&self, rows: Vec<SourceRecord>) {
        lock(&self.state).rows = rows;
    }

    /// Make every subsequent call fail with [`SyncError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Number of `fetch_all` calls that reached the store.
    pub fn fetches(&self) -> usize {
        lock(&self.state).fetches
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn fetch_all(&self) -> Result<Vec<SourceRecord>, SyncError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(SyncError::Unavailable("memory source offline".into()));
        }
        state.fetches += 1;
        Ok(state.rows.clone())
    }

    async fn reassign_machine_code(
        &self,
        mold_serial: &str,
        machine_cd: &str,
    ) -> Result<MachineAssignment, SyncError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(SyncError::Unavailable("memory source offline".into()));
        }

        let mut cleared = 0;
        for row in state
            .rows
            .iter_mut()
            .filter(|r| r.machine_cd.as_deref() == Some(machine_cd))
        {
            row.machine_cd = None;
            cleared += 1;
        }

        let mut assigned = 0;
        for row in state
            .rows
            .iter_mut()
            .filter(|r| r.mold_serial.as_deref() == Some(mold_serial))
        {
            row.machine_cd = Some(machine_cd.to_string());
            assigned += 1;
        }

        Ok(MachineAssignment { cleared, assigned })
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// One asset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAsset {
    pub id: u64,
    pub serial: Option<String>,
    pub deleted: bool,
    pub counters: TargetCounters,
}

#[derive(Debug, Default)]
struct TargetState {
    assets: Vec<MemoryAsset>,
    next_id: u64,
    updates: usize,
    mutations: u64,
    fail_on_update: Option<usize>,
    unavailable: bool,
}

/// Asset table held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    state: Arc<Mutex<TargetState>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, serial: &str, deleted: bool) -> u64 {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.assets.push(MemoryAsset {
            id,
            serial: Some(serial.to_string()),
            deleted,
            counters: TargetCounters::default(),
        });
        id
    }

    /// Insert a live asset and return its id.
    pub fn insert_asset(&self, serial: &str) -> u64 {
        self.insert(serial, false)
    }

    /// Insert a soft-deleted asset and return its id.
    pub fn insert_deleted_asset(&self, serial: &str) -> u64 {
        self.insert(serial, true)
    }

    pub fn counters(&self, id: u64) -> Option<TargetCounters> {
        lock(&self.state)
            .assets
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.counters)
    }

    pub fn snapshot(&self) -> Vec<MemoryAsset> {
        lock(&self.state).assets.clone()
    }

    /// Total asset rows changed by `apply_counters` so far.
    pub fn mutations(&self) -> u64 {
        lock(&self.state).mutations
    }

    /// Fail the `n`-th `apply_counters` call (1-based) and every later one.
    pub fn fail_on_update(&self, n: usize) {
        lock(&self.state).fail_on_update = Some(n);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn apply_counters(&self, serial: &str, counters: &TargetCounters) -> Result<u64, SyncError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(SyncError::Unavailable("memory target offline".into()));
        }
        state.updates += 1;
        if state.fail_on_update.is_some_and(|n| state.updates >= n) {
            return Err(SyncError::Unavailable(format!(
                "injected failure on update {}",
                state.updates
            )));
        }

        let mut affected = 0;
        for asset in state
            .assets
            .iter_mut()
            .filter(|a| !a.deleted && a.serial.as_deref() == Some(serial))
        {
            asset.counters = *counters;
            affected += 1;
        }
        state.mutations += affected;
        Ok(affected)
    }
}
