use chrono::{DateTime, Utc};
use seedbank_common::StreakRewards;

use crate::connection::Database;
use crate::error::{DbError, Result};
use crate::models::{DbFamily, NewFamily};

pub struct FamilyQueries;

impl FamilyQueries {
    pub async fn create(db: &Database, family: NewFamily) -> Result<DbFamily> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            INSERT INTO families (id, name, timezone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&family.id)
        .bind(&family.name)
        .bind(&family.timezone)
        .bind(family.created_at)
        .bind(family.created_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Self::get_by_id(db, &family.id).await,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::Duplicate(format!("Family {} already exists", family.id)))
            }
            Err(e) => Err(DbError::Sqlx(e)),
        }
    }

    pub async fn get_by_id(db: &Database, id: &str) -> Result<DbFamily> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbFamily>("SELECT * FROM families WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Family {} not found", id)))
    }

    pub async fn update_timezone(
        db: &Database,
        id: &str,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pool = db.pool()?;

        let result = sqlx::query("UPDATE families SET timezone = ?, updated_at = ? WHERE id = ?")
            .bind(timezone)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Family {} not found", id)));
        }

        Ok(())
    }

    pub async fn update_streak_rewards(
        db: &Database,
        id: &str,
        rewards: &StreakRewards,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            UPDATE families
            SET daily_streak_reward = ?, weekly_streak_reward = ?,
                monthly_streak_reward = ?, yearly_streak_reward = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rewards.daily)
        .bind(rewards.weekly)
        .bind(rewards.monthly)
        .bind(rewards.yearly)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Family {} not found", id)));
        }

        Ok(())
    }
}
