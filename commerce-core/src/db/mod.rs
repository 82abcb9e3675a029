//! Database Module
//!
//! Handles the SQLite connection pool and migrations. Every
//! concurrency-sensitive write in this crate is a single conditional
//! UPDATE checked through `rows_affected()`; the pool settings here (WAL,
//! busy_timeout) are what make those statements safe to issue from many
//! request tasks at once.

pub mod repository;

use repository::{RepoError, RepoResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Database service — owns a SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Create a new database service with WAL mode and run migrations
    pub async fn new(db_path: &str) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| RepoError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open database: {e}")))?;

        // busy_timeout: wait up to 5s on write contention instead of failing
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to set busy_timeout: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::DbService;

    /// On-disk SQLite in a temp dir so concurrent pool connections see one
    /// database (a `:memory:` pool would give each connection its own).
    /// Keep the returned TempDir alive for the duration of the test.
    pub(crate) async fn temp_db() -> (DbService, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("core.db");
        let db = DbService::new(path.to_str().expect("utf-8 path"))
            .await
            .expect("open test database");
        (db, dir)
    }
}
