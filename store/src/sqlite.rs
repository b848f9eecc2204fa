//! SQLite-backed store.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ratesync_common::{CurrencyCode, DeviceId, Rate, SelectionEntry, UserCurrencySelection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_rates, RateStore, SettingsStore};

/// Schema version recorded in the metadata table.
const SCHEMA_VERSION: &str = "1";

const DEVICE_ID_KEY: &str = "device_id";

/// SQLite database holding rates, the currency selection and metadata.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "Opening rate database");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            path: Some(path),
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so the
    /// pool is pinned to one connection that is never recycled.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let store = Self { pool, path: None };
        store.initialize().await?;
        Ok(store)
    }

    /// Location of the database file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Rate database closed");
    }

    async fn initialize(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rates (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                value REAL NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_currencies (
                code TEXT PRIMARY KEY,
                is_enabled INTEGER NOT NULL DEFAULT 1,
                position INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        debug!("Rate database schema ready");
        Ok(())
    }
}

fn row_to_rate(row: &SqliteRow) -> StoreResult<Rate> {
    let code: String = row.try_get("code")?;
    let name: String = row.try_get("name")?;
    let value: f64 = row.try_get("value")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(Rate::new(code, name, value, updated_at))
}

#[async_trait]
impl RateStore for SqliteStore {
    async fn load_rates(&self) -> StoreResult<Vec<Rate>> {
        let rows = sqlx::query("SELECT code, name, value, updated_at FROM rates ORDER BY code")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_rate).collect()
    }

    async fn upsert_rates(&self, rates: &[Rate]) -> StoreResult<usize> {
        if rates.is_empty() {
            return Ok(0);
        }
        validate_rates(rates)?;

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for rate in rates {
            let result = sqlx::query(
                r#"
                INSERT INTO rates (code, name, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO UPDATE SET
                    name = excluded.name,
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(rate.code.as_str())
            .bind(&rate.display_name)
            .bind(rate.units_per_base)
            .bind(rate.updated_at)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected() as usize;
        }

        tx.commit().await?;
        debug!(count = written, "Upserted rates");
        Ok(written)
    }

    async fn insert_missing_rates(&self, rates: &[Rate]) -> StoreResult<usize> {
        if rates.is_empty() {
            return Ok(0);
        }
        validate_rates(rates)?;

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for rate in rates {
            let result = sqlx::query(
                r#"
                INSERT INTO rates (code, name, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO NOTHING
                "#,
            )
            .bind(rate.code.as_str())
            .bind(&rate.display_name)
            .bind(rate.units_per_base)
            .bind(rate.updated_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn clear_rates(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM rates").execute(&self.pool).await?;
        info!(removed = result.rows_affected(), "Cleared rate cache");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn load_selection(&self, base: &CurrencyCode) -> StoreResult<Option<UserCurrencySelection>> {
        let rows = sqlx::query("SELECT code, is_enabled FROM user_currencies ORDER BY position, code")
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let code: String = row.try_get("code")?;
            let is_enabled: bool = row.try_get("is_enabled")?;
            entries.push(SelectionEntry {
                code: CurrencyCode::new(code),
                is_enabled,
            });
        }

        Ok(Some(UserCurrencySelection::from_entries(base.clone(), entries)))
    }

    async fn save_selection(&self, selection: &UserCurrencySelection) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_currencies")
            .execute(&mut *tx)
            .await?;

        for (position, entry) in selection.entries().iter().enumerate() {
            sqlx::query("INSERT INTO user_currencies (code, is_enabled, position) VALUES (?1, ?2, ?3)")
                .bind(entry.code.as_str())
                .bind(entry.is_enabled)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_or_create_device_id(&self) -> StoreResult<DeviceId> {
        sqlx::query("INSERT OR IGNORE INTO metadata (key, value) VALUES (?1, ?2)")
            .bind(DEVICE_ID_KEY)
            .bind(DeviceId::generate().to_string())
            .execute(&self.pool)
            .await?;

        let value: String = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?1")
            .bind(DEVICE_ID_KEY)
            .fetch_one(&self.pool)
            .await?;

        DeviceId::parse(&value).map_err(|e| StoreError::Corrupt {
            field: DEVICE_ID_KEY,
            reason: e.to_string(),
        })
    }
}
