//! SQLite state store for sms-gateway.

use super::StateStore;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use sms_types::{Cost, Counters, Fingerprint};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite-backed state store.
///
/// Runs with `synchronous = FULL`: a mutation that returned `Ok` survives a
/// crash.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Counter file written by older installs.
#[derive(Debug, Deserialize)]
struct LegacyCounter {
    sent_count: u64,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::debug!(path = %path.display(), "state store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .synchronous(SqliteSynchronous::Full);

        // One connection that never recycles: each connection to :memory:
        // is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed (
                fingerprint TEXT PRIMARY KEY,
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                sent_count INTEGER NOT NULL DEFAULT 0,
                total_cost_micros INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO counters (id, sent_count, total_cost_micros) VALUES (1, 0, 0)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Import the sent count from a legacy JSON counter file.
    ///
    /// Only applies when the file exists and the ledger is still empty.
    /// Returns the imported count.
    pub async fn import_legacy_counter(&self, path: &Path) -> Result<Option<u64>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Legacy {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        let legacy: LegacyCounter =
            serde_json::from_str(&content).map_err(|e| StoreError::Legacy {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let sent_count = to_column(legacy.sent_count)?;
        let result = sqlx::query(
            r#"
            UPDATE counters SET sent_count = ?1
            WHERE id = 1 AND sent_count = 0 AND total_cost_micros = 0
            "#,
        )
        .bind(sent_count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 && legacy.sent_count > 0 {
            tracing::info!(
                path = %path.display(),
                sent_count = legacy.sent_count,
                "imported legacy sent counter"
            );
            Ok(Some(legacy.sent_count))
        } else {
            Ok(None)
        }
    }

    fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

fn to_column(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("value {value} out of range")))
}

fn from_column(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn counters_from_row((sent_count, cost_micros): (i64, i64)) -> Result<Counters, StoreError> {
    Ok(Counters {
        sent_count: from_column(sent_count, "sent_count")?,
        total_cost: Cost::from_micros(from_column(cost_micros, "total_cost_micros")?),
    })
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn record_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO processed (fingerprint, recorded_at) VALUES (?1, ?2)",
        )
        .bind(fingerprint.as_str())
        .bind(Self::current_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let found: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM processed WHERE fingerprint = ?1")
                .bind(fingerprint.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(found > 0)
    }

    async fn processed_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed")
            .fetch_one(&self.pool)
            .await?;

        from_column(count, "processed count")
    }

    async fn clear_processed(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM processed")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn increment_counters(&self, cost: Cost) -> Result<Counters, StoreError> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            UPDATE counters
            SET sent_count = sent_count + 1,
                total_cost_micros = total_cost_micros + ?1
            WHERE id = 1
            RETURNING sent_count, total_cost_micros
            "#,
        )
        .bind(to_column(cost.micros())?)
        .fetch_one(&self.pool)
        .await?;

        counters_from_row(row)
    }

    async fn counters(&self) -> Result<Counters, StoreError> {
        let row: (i64, i64) =
            sqlx::query_as("SELECT sent_count, total_cost_micros FROM counters WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        counters_from_row(row)
    }

    async fn reset_counters(&self) -> Result<(), StoreError> {
        sqlx::query("UPDATE counters SET sent_count = 0, total_cost_micros = 0 WHERE id = 1")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA wal_checkpoint(FULL)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
