use chrono::{DateTime, NaiveDate, Utc};
use seedbank_common::TaskStatus;
use sqlx::{Executor, Sqlite};

use crate::error::{DbError, Result};
use crate::models::{DbTaskInstance, NewTaskInstance};

pub struct TaskQueries;

impl TaskQueries {
    /// Inserts a routine-backed instance unless one already exists for its
    /// (item, child, day). Returns whether a row was written.
    pub async fn insert_if_absent<'e, E>(executor: E, task: &NewTaskInstance) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO task_instances
                (id, family_id, template_id, item_id, child_id, title, point_value,
                 status, day, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING', ?, ?)
            ON CONFLICT (item_id, child_id, day) DO NOTHING
            "#,
        )
        .bind(&task.id)
        .bind(&task.family_id)
        .bind(&task.template_id)
        .bind(&task.item_id)
        .bind(&task.child_id)
        .bind(&task.title)
        .bind(task.point_value)
        .bind(task.day)
        .bind(task.created_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert<'e, E>(executor: E, task: &NewTaskInstance) -> Result<DbTaskInstance>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbTaskInstance>(
            r#"
            INSERT INTO task_instances
                (id, family_id, template_id, item_id, child_id, title, point_value,
                 status, day, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING', ?, ?)
            RETURNING *
            "#,
        )
        .bind(&task.id)
        .bind(&task.family_id)
        .bind(&task.template_id)
        .bind(&task.item_id)
        .bind(&task.child_id)
        .bind(&task.title)
        .bind(task.point_value)
        .bind(task.day)
        .bind(task.created_at)
        .fetch_one(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn find<'e, E>(executor: E, id: &str) -> Result<Option<DbTaskInstance>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbTaskInstance>("SELECT * FROM task_instances WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(DbError::Sqlx)
    }

    /// Instances for a family-local day, optionally narrowed to one child.
    pub async fn list_for_day<'e, E>(
        executor: E,
        family_id: &str,
        child_id: Option<&str>,
        day: NaiveDate,
    ) -> Result<Vec<DbTaskInstance>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbTaskInstance>(
            r#"
            SELECT t.* FROM task_instances t
            LEFT JOIN routine_items i ON i.id = t.item_id
            WHERE t.family_id = ? AND t.day = ? AND (? IS NULL OR t.child_id = ?)
            ORDER BY t.child_id, t.template_id IS NULL, t.template_id, i.position, t.created_at, t.id
            "#,
        )
        .bind(family_id)
        .bind(day)
        .bind(child_id)
        .bind(child_id)
        .fetch_all(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    /// Compare-and-set on status. Returns false when the task was not in `from`.
    pub async fn transition<'e, E>(
        executor: E,
        id: &str,
        from: TaskStatus,
        to: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE task_instances SET status = ?, completed_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(completed_at)
        .bind(id)
        .bind(from.as_str())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Completed instances, most recently completed first.
    pub async fn list_completed<'e, E>(
        executor: E,
        family_id: &str,
        child_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DbTaskInstance>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbTaskInstance>(
            r#"
            SELECT * FROM task_instances
            WHERE family_id = ? AND status = 'COMPLETED' AND (? IS NULL OR child_id = ?)
            ORDER BY completed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(family_id)
        .bind(child_id)
        .bind(child_id)
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(DbError::Sqlx)
    }
}
