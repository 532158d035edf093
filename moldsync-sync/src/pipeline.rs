//! Shared entrypoint used by the CLI and the daemon to build a SQL-backed
//! engine from startup settings.

use moldsync_core::Settings;

use crate::sql::{PoolSettings, SqlStore};
use crate::{SyncEngine, SyncError};

/// Engine over the two configured databases.
pub type SqlEngine = SyncEngine<SqlStore, SqlStore>;

/// Open both pools and build the engine.
///
/// # Errors
/// [`SyncError::Connect`] if either database is unreachable.
pub async fn connect(settings: &Settings) -> Result<SqlEngine, SyncError> {
    connect_with(settings, &PoolSettings::default()).await
}

pub async fn connect_with(settings: &Settings, pool: &PoolSettings) -> Result<SqlEngine, SyncError> {
    let source = SqlStore::connect_with(&settings.source_url, pool).await?;
    let target = SqlStore::connect_with(&settings.target_url, pool).await?;
    Ok(SyncEngine::new(source, target))
}

/// Build the engine without touching either database. Used by the daemon,
/// where an outage at startup must behave like an outage mid-run.
pub fn connect_lazy(settings: &Settings) -> Result<SqlEngine, SyncError> {
    let pool = PoolSettings::default();
    let source = SqlStore::connect_lazy_with(&settings.source_url, &pool)?;
    let target = SqlStore::connect_lazy_with(&settings.target_url, &pool)?;
    Ok(SyncEngine::new(source, target))
}

/// Open only the source database, for checkout updates.
pub async fn connect_source(source_url: &str) -> Result<SqlStore, SyncError> {
    SqlStore::connect(source_url).await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[tokio::test]
    async fn lazy_engine_fails_on_first_pass_not_at_build() {
        let settings = Settings {
            env_file: PathBuf::from(".env"),
            source_url: "sqlite:///nonexistent-dir/definitely/missing.db".to_string(),
            target_url: "sqlite::memory:".to_string(),
        };
        let engine = connect_lazy(&settings).expect("lazy build never connects");
        assert!(engine.run().await.is_err());
    }

    #[test]
    fn lazy_build_rejects_malformed_url() {
        let settings = Settings {
            env_file: PathBuf::from(".env"),
            source_url: "not a url".to_string(),
            target_url: "sqlite::memory:".to_string(),
        };
        assert!(matches!(
            connect_lazy(&settings),
            Err(SyncError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_database_reports_redacted_url() {
        let settings = Settings {
            env_file: PathBuf::from(".env"),
            source_url: "sqlite:///nonexistent-dir/definitely/missing.db".to_string(),
            target_url: "sqlite::memory:".to_string(),
        };
        let pool = PoolSettings {
            acquire_timeout: std::time::Duration::from_secs(2),
            ..PoolSettings::default()
        };
        let Err(err) = connect_with(&settings, &pool).await else {
            panic!("connecting to a missing sqlite file should fail");
        };
        assert!(matches!(err, SyncError::Connect { .. }), "got: {err}");
        assert!(err.to_string().contains("missing.db"));
    }
}
