use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{DbError, Result};
use crate::models::{DbLedgerEntry, NewLedgerEntry};

/// Half-open `[start, end)` window over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct LedgerQueries;

impl LedgerQueries {
    /// Appends an entry. Rows are never updated or deleted afterwards.
    pub async fn insert<'e, E>(executor: E, entry: &NewLedgerEntry) -> Result<DbLedgerEntry>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if entry.amount == 0 {
            return Err(DbError::InvalidData("ledger amount must not be zero".to_string()));
        }

        sqlx::query_as::<_, DbLedgerEntry>(
            r#"
            INSERT INTO ledger_entries
                (family_id, child_id, kind, amount, note, author_id, task_id, request_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&entry.family_id)
        .bind(&entry.child_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.note)
        .bind(&entry.author_id)
        .bind(&entry.task_id)
        .bind(&entry.request_id)
        .bind(entry.created_at)
        .fetch_one(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn balance<'e, E>(executor: E, child_id: &str) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE child_id = ?",
        )
        .bind(child_id)
        .fetch_one(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    /// A child's entries newest first, optionally restricted to a time window.
    pub async fn list_for_child<'e, E>(
        executor: E,
        child_id: &str,
        range: Option<TimeRange>,
        limit: i64,
    ) -> Result<Vec<DbLedgerEntry>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbLedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE child_id = ?
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at < ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(child_id)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .bind(range.map(|r| r.end))
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn list_for_family<'e, E>(
        executor: E,
        family_id: &str,
        range: Option<TimeRange>,
        limit: i64,
    ) -> Result<Vec<DbLedgerEntry>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbLedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE family_id = ?
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at < ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(family_id)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .bind(range.map(|r| r.end))
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(DbError::Sqlx)
    }
}
