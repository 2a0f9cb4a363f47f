//! # Scheduler Store
//!
//! Pool ownership and schema bring-up for the orchestrator-owned durable
//! state: the job queue and the bulk schedule ledger.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::SchedulerError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cadence_jobs (
    job_id      TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    lead_id     TEXT NOT NULL,
    run_at      INTEGER NOT NULL,
    schedule_id TEXT,
    payload     TEXT NOT NULL DEFAULT 'null',
    created_at  INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_cadence_jobs_singleton
    ON cadence_jobs (lead_id) WHERE kind IN ('retry', 'callback');

CREATE INDEX IF NOT EXISTS idx_cadence_jobs_run_at
    ON cadence_jobs (run_at);

CREATE INDEX IF NOT EXISTS idx_cadence_jobs_schedule
    ON cadence_jobs (schedule_id) WHERE schedule_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS cadence_bulk_schedules (
    schedule_id            TEXT PRIMARY KEY,
    requested_start        INTEGER NOT NULL,
    parallel_calls         INTEGER NOT NULL,
    batch_interval_seconds INTEGER NOT NULL,
    lead_count             INTEGER NOT NULL,
    status                 TEXT NOT NULL,
    created_at             INTEGER NOT NULL
);
"#;

/// Owner of the SQLite pool backing the scheduler. Reopening the same
/// database file after a restart yields every unclaimed job untouched.
#[derive(Debug, Clone)]
pub struct SchedulerStore {
    pool: SqlitePool,
}

impl SchedulerStore {
    /// Open (creating if missing) the durable store at the given SQLite URL,
    /// e.g. `sqlite:cadence.db`, and bring the schema up.
    pub async fn open(url: &str) -> Result<Self, SchedulerError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        debug!(url = %url, "Scheduler store opened");
        Ok(store)
    }

    /// An in-memory store for ephemeral use. Single connection, since every
    /// SQLite memory database is private to its connection.
    pub async fn in_memory() -> Result<Self, SchedulerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), SchedulerError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
