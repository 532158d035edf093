//! One source → target pass.
//!
//! The pass is not transactional. Each row is an independent update; a
//! failure stops the pass and earlier rows stay written. Since every update
//! sets absolute values, re-running the whole pass converges.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{SourceStore, TargetStore};
use crate::SyncError;

/// Counts from a completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Source rows fetched.
    pub rows_read: usize,
    /// Rows whose serial matched at least one live asset.
    pub matched: usize,
    /// Rows whose serial matched nothing (or only soft-deleted assets).
    pub unmatched: usize,
    /// Rows with a NULL `mold_serial`.
    pub without_serial: usize,
    /// Sum of rows affected on the target.
    pub assets_updated: u64,
    pub duration_ms: u128,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    /// One-line summary for the sync log.
    pub fn summary(&self) -> String {
        format!(
            "read {} source rows: {} matched, {} unmatched, {} without serial ({} assets updated)",
            self.rows_read, self.matched, self.unmatched, self.without_serial, self.assets_updated
        )
    }
}

/// Something the scheduler can run once per cycle.
#[async_trait]
pub trait SyncPass: Send + Sync {
    async fn run(&self) -> Result<PassReport, SyncError>;
}

/// The fixed mold-master → asset projection.
pub struct SyncEngine<S, T> {
    source: S,
    target: T,
}

impl<S, T> SyncEngine<S, T>
where
    S: SourceStore,
    T: TargetStore,
{
    pub fn new(source: S, target: T) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Run one full pass.
    ///
    /// # Errors
    /// A failed source read is returned as is. A failed target update is
    /// wrapped in [`SyncError::Aborted`] with the number of rows already
    /// applied.
    pub async fn run(&self) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let rows = self.source.fetch_all().await?;
        let total = rows.len();
        tracing::debug!("fetched {total} mold master rows");

        let mut matched = 0usize;
        let mut unmatched = 0usize;
        let mut without_serial = 0usize;
        let mut assets_updated = 0u64;

        for (applied, row) in rows.iter().enumerate() {
            let Some(serial) = row.mold_serial.as_deref() else {
                without_serial += 1;
                continue;
            };

            let affected = self
                .target
                .apply_counters(serial, &row.counters())
                .await
                .map_err(|err| SyncError::Aborted {
                    applied,
                    total,
                    source: Box::new(err),
                })?;

            if affected == 0 {
                unmatched += 1;
            } else {
                matched += 1;
                assets_updated += affected;
            }
        }

        Ok(PassReport {
            rows_read: total,
            matched,
            unmatched,
            without_serial,
            assets_updated,
            duration_ms: started.elapsed().as_millis(),
            finished_at: Utc::now(),
        })
    }
}

#[async_trait]
impl<S, T> SyncPass for SyncEngine<S, T>
where
    S: SourceStore,
    T: TargetStore,
{
    async fn run(&self) -> Result<PassReport, SyncError> {
        SyncEngine::run(self).await
    }
}

#[cfg(test)]
mod tests {
    use moldsync_core::{SourceRecord, TargetCounters};

    use super::*;
    use crate::memory::{MemorySource, MemoryTarget};

    fn counters(a: i64, b: i64, c: i64) -> TargetCounters {
        TargetCounters {
            maintenance_shot_24: Some(a),
            scrap_shot_26: Some(b),
            shot_qty_25: Some(c),
        }
    }

    #[tokio::test]
    async fn single_row_lands_in_mapped_slots() {
        let source = MemorySource::new(vec![SourceRecord::new("M1", 5, 2, 1)]);
        let target = MemoryTarget::new();
        let id = target.insert_asset("M1");
        let other = target.insert_asset("M9");

        let engine = SyncEngine::new(source, target);
        let report = engine.run().await.expect("pass");

        assert_eq!(report.rows_read, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(engine.target().counters(id), Some(counters(5, 2, 1)));
        assert_eq!(engine.target().counters(other), Some(TargetCounters::default()));
        assert_eq!(engine.target().mutations(), 1);
    }

    #[tokio::test]
    async fn unmatched_and_soft_deleted_rows_are_noops() {
        let source = MemorySource::new(vec![
            SourceRecord::new("GHOST", 1, 1, 1),
            SourceRecord::new("GONE", 7, 7, 7),
        ]);
        let target = MemoryTarget::new();
        let gone = target.insert_deleted_asset("GONE");

        let engine = SyncEngine::new(source, target);
        let report = engine.run().await.expect("pass");

        assert_eq!(report.unmatched, 2);
        assert_eq!(report.assets_updated, 0);
        assert_eq!(engine.target().mutations(), 0);
        assert_eq!(engine.target().counters(gone), Some(TargetCounters::default()));
    }

    #[tokio::test]
    async fn rows_without_serial_are_skipped() {
        let source = MemorySource::new(vec![SourceRecord {
            maintenance_shot: Some(3),
            ..Default::default()
        }]);
        let engine = SyncEngine::new(source, MemoryTarget::new());
        let report = engine.run().await.expect("pass");
        assert_eq!(report.without_serial, 1);
        assert_eq!(report.matched + report.unmatched, 0);
    }

    #[tokio::test]
    async fn second_pass_over_unchanged_source_is_identical() {
        let source = MemorySource::new(vec![
            SourceRecord::new("M1", 5, 2, 1),
            SourceRecord::new("M2", 9, 0, 4),
        ]);
        let target = MemoryTarget::new();
        target.insert_asset("M1");
        target.insert_asset("M2");
        let engine = SyncEngine::new(source, target);

        engine.run().await.expect("first pass");
        let after_first = engine.target().snapshot();
        engine.run().await.expect("second pass");
        assert_eq!(engine.target().snapshot(), after_first);
    }

    #[tokio::test]
    async fn failure_midway_keeps_earlier_rows() {
        let source = MemorySource::new(vec![
            SourceRecord::new("M1", 1, 1, 1),
            SourceRecord::new("M2", 2, 2, 2),
            SourceRecord::new("M3", 3, 3, 3),
        ]);
        let target = MemoryTarget::new();
        let first = target.insert_asset("M1");
        let third = target.insert_asset("M3");
        target.insert_asset("M2");
        target.fail_on_update(2);

        let engine = SyncEngine::new(source, target);
        let err = engine.run().await.unwrap_err();

        match &err {
            SyncError::Aborted { applied, total, .. } => {
                assert_eq!((*applied, *total), (1, 3));
            }
            other => panic!("expected Aborted, got {other}"),
        }
        assert!(err.to_string().contains("after 1 of 3 rows"));
        assert_eq!(engine.target().counters(first), Some(counters(1, 1, 1)));
        assert_eq!(engine.target().counters(third), Some(TargetCounters::default()));
    }

    #[tokio::test]
    async fn source_outage_is_returned_unwrapped() {
        let source = MemorySource::new(vec![SourceRecord::new("M1", 1, 1, 1)]);
        source.set_unavailable(true);
        let engine = SyncEngine::new(source, MemoryTarget::new());
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Unavailable(_)), "got: {err}");
    }
}
