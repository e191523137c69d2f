use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use super::{MIGRATION_001_WORLD_STATE, StateEntry, StateStore};

/// How long a connection waits on another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// A world-state entry together with its write history metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedState {
    pub key: String,
    pub value: Vec<u8>,
    /// Number of writes the key has seen, starting at 1.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Durable world state backed by SQLite.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database by URL.
    /// Uses WAL journaling so several processes can share one database file.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_WORLD_STATE)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Create (or reuse) the database file at `path` and bring its schema up to date.
    pub async fn create(path: &str) -> Result<Self> {
        Self::init(&format!("sqlite:{}?mode=rwc", path)).await
    }

    /// Open an existing database file.
    pub async fn open(path: &str) -> Result<Self> {
        Self::connect(&format!("sqlite:{}", path)).await
    }

    /// Get an entry with its version metadata.
    pub async fn get_versioned(&self, key: &str) -> Result<Option<VersionedState>> {
        let row = sqlx::query(
            r#"
            SELECT key, value, version, updated_at
            FROM world_state
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch versioned state")?;

        row.as_ref().map(Self::row_to_state).transpose()
    }

    /// List every entry in world state, ordered by key.
    pub async fn list_states(&self) -> Result<Vec<VersionedState>> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, version, updated_at
            FROM world_state
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list world state")?;

        rows.iter().map(Self::row_to_state).collect()
    }

    fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<VersionedState> {
        let updated_at_str: String = row.get("updated_at");

        Ok(VersionedState {
            key: row.get("key"),
            value: row.get("value"),
            version: row.get("version"),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM world_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch state for {}", key))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        let row = sqlx::query("SELECT value, version FROM world_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch state for {}", key))?;

        Ok(row.map(|row| StateEntry {
            value: row.get("value"),
            version: row.get("version"),
        }))
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO world_state (key, value, version, updated_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                version = world_state.version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save state for {}", key))?;
        Ok(())
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_version: i64,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE world_state
            SET value = ?, version = version + 1, updated_at = ?
            WHERE key = ? AND version = ?
            "#,
        )
        .bind(value)
        .bind(&now)
        .bind(key)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save state for {}", key))?;

        Ok(result.rows_affected() == 1)
    }
}
