use chrono::{DateTime, Utc};
use seedbank_common::RequestStatus;
use sqlx::{Executor, Sqlite};

use crate::connection::Database;
use crate::error::{DbError, Result};
use crate::models::{
    DbPrivilegeDefinition, DbPrivilegeRequest, NewPrivilegeDefinition, NewPrivilegeRequest,
};

pub struct PrivilegeQueries;

impl PrivilegeQueries {
    // ------------------------------------------------------------------------
    // Catalogue
    // ------------------------------------------------------------------------

    pub async fn create_definition(
        db: &Database,
        privilege: NewPrivilegeDefinition,
    ) -> Result<DbPrivilegeDefinition> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbPrivilegeDefinition>(
            r#"
            INSERT INTO privilege_definitions
                (id, family_id, title, description, cost, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&privilege.id)
        .bind(&privilege.family_id)
        .bind(&privilege.title)
        .bind(&privilege.description)
        .bind(privilege.cost)
        .bind(privilege.created_at)
        .bind(privilege.created_at)
        .fetch_one(pool)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn find_definition(
        db: &Database,
        id: &str,
    ) -> Result<Option<DbPrivilegeDefinition>> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbPrivilegeDefinition>(
            "SELECT * FROM privilege_definitions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn list_definitions(
        db: &Database,
        family_id: &str,
        include_retired: bool,
    ) -> Result<Vec<DbPrivilegeDefinition>> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbPrivilegeDefinition>(
            r#"
            SELECT * FROM privilege_definitions
            WHERE family_id = ? AND (active = 1 OR ?)
            ORDER BY cost, title
            "#,
        )
        .bind(family_id)
        .bind(include_retired)
        .fetch_all(pool)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn retire_definition(db: &Database, id: &str, now: DateTime<Utc>) -> Result<()> {
        let pool = db.pool()?;

        let result =
            sqlx::query("UPDATE privilege_definitions SET active = 0, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Privilege {} not found", id)));
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    pub async fn insert_request<'e, E>(
        executor: E,
        request: &NewPrivilegeRequest,
    ) -> Result<DbPrivilegeRequest>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbPrivilegeRequest>(
            r#"
            INSERT INTO privilege_requests
                (id, family_id, privilege_id, child_id, title, cost, status, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 'PENDING', ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.id)
        .bind(&request.family_id)
        .bind(&request.privilege_id)
        .bind(&request.child_id)
        .bind(&request.title)
        .bind(request.cost)
        .bind(&request.note)
        .bind(request.created_at)
        .fetch_one(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn find_request<'e, E>(executor: E, id: &str) -> Result<Option<DbPrivilegeRequest>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbPrivilegeRequest>("SELECT * FROM privilege_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(DbError::Sqlx)
    }

    /// Moves a PENDING request to `status`. Returns None when the request was not
    /// pending (or does not exist).
    pub async fn resolve_request<'e, E>(
        executor: E,
        id: &str,
        status: RequestStatus,
        resolved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DbPrivilegeRequest>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbPrivilegeRequest>(
            r#"
            UPDATE privilege_requests
            SET status = ?, resolved_by = ?, resolved_at = ?
            WHERE id = ? AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(resolved_by)
        .bind(at)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    /// Moves an APPROVED request to TERMINATED. Returns None when it was not approved.
    pub async fn terminate_request<'e, E>(
        executor: E,
        id: &str,
        terminated_by: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DbPrivilegeRequest>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DbPrivilegeRequest>(
            r#"
            UPDATE privilege_requests
            SET status = 'TERMINATED', terminated_by = ?, terminated_at = ?
            WHERE id = ? AND status = 'APPROVED'
            RETURNING *
            "#,
        )
        .bind(terminated_by)
        .bind(at)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(DbError::Sqlx)
    }

    /// Requests newest first, filtered by family or child and optionally by status.
    pub async fn list_requests<'e, E>(
        executor: E,
        family_id: &str,
        child_id: Option<&str>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<DbPrivilegeRequest>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let status = status.map(|s| s.as_str());

        sqlx::query_as::<_, DbPrivilegeRequest>(
            r#"
            SELECT * FROM privilege_requests
            WHERE family_id = ?
              AND (? IS NULL OR child_id = ?)
              AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(family_id)
        .bind(child_id)
        .bind(child_id)
        .bind(status)
        .bind(status)
        .fetch_all(executor)
        .await
        .map_err(DbError::Sqlx)
    }
}
