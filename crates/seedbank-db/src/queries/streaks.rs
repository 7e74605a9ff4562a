use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{DbError, Result};
use crate::models::DbStreakState;

pub struct StreakQueries;

impl StreakQueries {
    pub async fn find<'e, E>(executor: E, child_id: &str) -> Result<Option<DbStreakState>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbStreakState>("SELECT * FROM streak_states WHERE child_id = ?")
            .bind(child_id)
            .fetch_optional(executor)
            .await
            .map_err(DbError::Sqlx)
    }

    pub async fn upsert<'e, E>(executor: E, state: &DbStreakState) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO streak_states
                (child_id, current_count, longest_count, last_qualifying_day, rewarded, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (child_id) DO UPDATE SET
                current_count = excluded.current_count,
                longest_count = excluded.longest_count,
                last_qualifying_day = excluded.last_qualifying_day,
                rewarded = excluded.rewarded,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.child_id)
        .bind(state.current_count)
        .bind(state.longest_count)
        .bind(state.last_qualifying_day)
        .bind(&state.rewarded)
        .bind(state.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Creates an empty state row if none exists. Used to take the write lock before
    /// reading the state inside a transaction.
    pub async fn ensure<'e, E>(executor: E, child_id: &str, now: DateTime<Utc>) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO streak_states (child_id, current_count, longest_count, rewarded, updated_at)
            VALUES (?, 0, 0, '', ?)
            ON CONFLICT (child_id) DO NOTHING
            "#,
        )
        .bind(child_id)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Breaks a run whose last qualifying day is before `yesterday`. The condition is
    /// evaluated by SQLite, so a concurrent completion that already moved the day forward
    /// is never overwritten. Returns whether a reset happened.
    pub async fn reset_if_stale<'e, E>(
        executor: E,
        child_id: &str,
        yesterday: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE streak_states
            SET current_count = 0, rewarded = '', updated_at = ?
            WHERE child_id = ?
              AND last_qualifying_day IS NOT NULL
              AND last_qualifying_day < ?
              AND (current_count > 0 OR rewarded != '')
            "#,
        )
        .bind(now)
        .bind(child_id)
        .bind(yesterday)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
