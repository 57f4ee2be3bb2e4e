mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::extract::PostRecord;

/// One writer and one reader.
const MAX_CONNECTIONS: u32 = 2;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite store for collected posts.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, a migration fails, or the database
    /// is read-only.
    pub async fn new(path: &Path) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_options(path))
            .await
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;

        let db = Self { pool };
        migrations::run(&db.pool).await?;
        db.ensure_writable()
            .await
            .with_context(|| format!("SQLite database is not writable: {}", path.display()))?;

        info!(path = %path.display(), "Database ready");
        Ok(db)
    }

    /// Take and release the write lock without changing anything.
    async fn ensure_writable(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        Ok(())
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
}

/// Outcome of handing one batch to a [`RecordSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub received: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Downstream consumer of the records collected for one query.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist `records`, skipping ones already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be written.
    async fn accept(&self, query: &str, records: &[PostRecord]) -> Result<SinkReport>;
}

#[async_trait]
impl RecordSink for Database {
    async fn accept(&self, query: &str, records: &[PostRecord]) -> Result<SinkReport> {
        let inserted = insert_posts(&self.pool, query, records).await?;
        let report = SinkReport {
            received: records.len(),
            inserted,
            duplicates: records.len() - inserted,
        };
        debug!(
            query = %query,
            received = report.received,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "Stored batch"
        );
        Ok(report)
    }
}
