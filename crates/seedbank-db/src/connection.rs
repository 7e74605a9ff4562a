use crate::error::{DbError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
    /// How long a writer waits for the SQLite write lock before failing.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "seedbank.db".to_string(), max_connections: 5, busy_timeout_secs: 10 }
    }
}

#[derive(Clone)]
pub struct Database {
    pub pool: Option<Pool<Sqlite>>,
}

impl Database {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let pool = Self::create_pool(&config).await?;

        Ok(Self { pool: Some(pool) })
    }

    async fn create_pool(config: &DatabaseConfig) -> Result<Pool<Sqlite>> {
        let path = Path::new(&config.path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {}", parent.display());
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Database connection pool created: {}", config.path);

        Ok(pool)
    }

    pub fn pool(&self) -> Result<&Pool<Sqlite>> {
        self.pool
            .as_ref()
            .ok_or_else(|| DbError::InvalidData("Database pool not initialized".to_string()))
    }

    /// Opens a deferred transaction. Callers that read before writing must issue their
    /// first write up front so the transaction owns the write lock before it reads.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool()?.begin().await?)
    }

    pub async fn close(mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("Database connection pool closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(path: &Path) -> DatabaseConfig {
        DatabaseConfig { path: path.to_str().unwrap().to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db = Database::new(config_for(&dir.path().join("test.db"))).await.unwrap();
        assert!(db.pool.is_some());

        let pool = db.pool().unwrap();
        let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await.unwrap();

        assert_eq!(result, 1);
    }

    #[tokio::test]
    async fn test_database_with_subdirectory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("subdir").join("test.db");

        let db = Database::new(config_for(&db_path)).await.unwrap();
        assert!(db.pool.is_some());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let dir = tempdir().unwrap();
        let db = Database::new(config_for(&dir.path().join("test.db"))).await.unwrap();

        let enabled: i64 =
            sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(db.pool().unwrap()).await.unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_database_close() {
        let dir = tempdir().unwrap();
        let db = Database::new(config_for(&dir.path().join("test.db"))).await.unwrap();
        db.close().await;
    }
}
