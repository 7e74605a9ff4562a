use crate::connection::Database;
use crate::error::Result;
use sqlx::migrate::Migrator;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,
    pub pending_migrations: usize,
    pub latest_version: Option<i64>,
}

impl Database {
    pub async fn run_migrations(&self) -> Result<()> {
        let pool = self.pool()?;

        info!("Running database migrations");
        MIGRATOR.run(pool).await?;
        info!("Database migrations completed successfully");

        Ok(())
    }

    pub async fn migration_status(&self) -> Result<MigrationStatus> {
        let pool = self.pool()?;

        let applied: Vec<i64> =
            sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
                .fetch_all(pool)
                .await?;

        let pending = MIGRATOR
            .iter()
            .filter(|migration| !applied.contains(&migration.version))
            .count();

        let status = MigrationStatus {
            applied_migrations: applied.len(),
            pending_migrations: pending,
            latest_version: applied.iter().copied().max(),
        };

        info!("Current migration version: {:?}", status.latest_version);

        Ok(status)
    }
}
