//! Error types for moldsync-sync.

use thiserror::Error;

/// All errors that can arise from a sync pass or a checkout update.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Opening a connection pool failed. The URL is stored with its
    /// credentials redacted.
    #[error("cannot connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    /// A query failed.
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A non-SQL store reported a failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Caller supplied a value the operation cannot use.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A pass stopped partway. Rows before `applied` were written and stay
    /// written.
    #[error("sync pass aborted after {applied} of {total} rows: {source}")]
    Aborted {
        applied: usize,
        total: usize,
        #[source]
        source: Box<SyncError>,
    },
}

/// Convenience constructor for [`SyncError::Database`].
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> SyncError {
    move |source| SyncError::Database { context, source }
}
