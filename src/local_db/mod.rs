//! # Local Database Module
//!
//! On-device persistence for offline-first report capture.
//!
//! ## Architecture
//!
//! Everything is stored as whole serialized documents under fixed string
//! keys. A write replaces the full document in one statement, so an
//! interrupted process loses at most the mutation it was making and never
//! leaves a half-written collection behind.
//!
//! - [`Storage`]: the key/value seam
//! - [`LocalDatabase`]: SQLite-backed storage (WAL mode)
//! - [`MemoryStorage`]: in-process storage for tests and ephemeral sessions
//! - [`sync`]: report cache, pending queue and sync metadata over a [`Storage`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use straywatch::local_db::{LocalDatabase, sync::LocalStore};
//!
//! # async fn example() -> Result<(), straywatch::shared::error::StoreError> {
//! let db = LocalDatabase::open("/tmp/straywatch/offline.db").await?;
//! let store = LocalStore::new(Arc::new(db));
//! println!("{} reports waiting", store.pending_count().await?);
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod sync;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::shared::error::StoreError;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Key/value persistence used by the local store
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the document stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the document stored under `key`
    async fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed storage
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates the parent directory if needed and runs pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        tracing::debug!(path = %path.display(), "opened local database");
        Ok(db)
    }

    /// Open a private in-memory database
    pub async fn open_in_memory() -> Result<Self> {
        // every in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let current_version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for version in schema::get_pending_migrations(current_version.0 as i32) {
            self.apply_migration(version).await?;
        }
        Ok(())
    }

    async fn apply_migration(&self, version: i32) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in schema::migration_statements(version) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(version, "applied local schema migration");
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalDatabase {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.documents.write().await.remove(key);
        Ok(())
    }
}
