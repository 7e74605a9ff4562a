use chrono::{DateTime, Utc};
use seedbank_common::RoutineTemplate;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::connection::Database;
use crate::error::{DbError, Result};
use crate::models::{
    DbRoutineItem, DbRoutineTemplate, NewRoutineTemplate, RoutineItemWrite, RoutineTemplateUpdate,
};

pub struct RoutineQueries;

impl RoutineQueries {
    /// Inserts the template with its items (positions follow list order) and assignments.
    pub async fn create(db: &Database, template: NewRoutineTemplate) -> Result<RoutineTemplate> {
        let mut tx = db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO routine_templates
                (id, family_id, name, description, weekdays, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&template.id)
        .bind(&template.family_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.weekdays.to_key_string())
        .bind(template.created_at)
        .bind(template.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in template.items.iter().enumerate() {
            Self::insert_item(&mut tx, &template.id, position as i64, item).await?;
        }
        Self::replace_assignments(&mut tx, &template.id, &template.child_ids).await?;

        tx.commit().await?;

        Self::load(db, &template.id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Routine {} not found", template.id)))
    }

    /// Rewrites the template. Items carrying an id are updated in place, items without one
    /// are appended and active items missing from the list are retired.
    pub async fn update(db: &Database, update: RoutineTemplateUpdate) -> Result<RoutineTemplate> {
        let mut tx = db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE routine_templates
            SET name = ?, description = ?, weekdays = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.weekdays.to_key_string())
        .bind(update.updated_at)
        .bind(&update.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Routine {} not found", update.id)));
        }

        let kept: Vec<&str> = update.items.iter().filter_map(|item| item.id.as_deref()).collect();
        let existing: Vec<String> =
            sqlx::query_scalar("SELECT id FROM routine_items WHERE template_id = ? AND active = 1")
                .bind(&update.id)
                .fetch_all(&mut *tx)
                .await?;

        for id in existing.iter().filter(|id| !kept.contains(&id.as_str())) {
            sqlx::query("UPDATE routine_items SET active = 0 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        for (position, item) in update.items.iter().enumerate() {
            match &item.id {
                Some(item_id) => {
                    let result = sqlx::query(
                        r#"
                        UPDATE routine_items
                        SET title = ?, point_value = ?, position = ?, active = 1
                        WHERE id = ? AND template_id = ?
                        "#,
                    )
                    .bind(&item.title)
                    .bind(item.point_value)
                    .bind(position as i64)
                    .bind(item_id)
                    .bind(&update.id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(DbError::NotFound(format!(
                            "Routine item {} not found in routine {}",
                            item_id, update.id
                        )));
                    }
                }
                None => Self::insert_item(&mut tx, &update.id, position as i64, item).await?,
            }
        }

        Self::replace_assignments(&mut tx, &update.id, &update.child_ids).await?;

        tx.commit().await?;

        Self::load(db, &update.id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Routine {} not found", update.id)))
    }

    pub async fn set_active(
        db: &Database,
        id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pool = db.pool()?;

        let result =
            sqlx::query("UPDATE routine_templates SET active = ?, updated_at = ? WHERE id = ?")
                .bind(active)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Routine {} not found", id)));
        }

        Ok(())
    }

    /// The template with its active items (ordered by position) and assigned children.
    pub async fn load(db: &Database, id: &str) -> Result<Option<RoutineTemplate>> {
        let pool = db.pool()?;

        let row = sqlx::query_as::<_, DbRoutineTemplate>(
            "SELECT * FROM routine_templates WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::assemble(db, row).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_for_family(
        db: &Database,
        family_id: &str,
        include_archived: bool,
    ) -> Result<Vec<RoutineTemplate>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbRoutineTemplate>(
            r#"
            SELECT * FROM routine_templates
            WHERE family_id = ? AND (active = 1 OR ?)
            ORDER BY created_at, id
            "#,
        )
        .bind(family_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await?;

        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            templates.push(Self::assemble(db, row).await?);
        }

        Ok(templates)
    }

    async fn assemble(db: &Database, row: DbRoutineTemplate) -> Result<RoutineTemplate> {
        let pool = db.pool()?;

        let items = sqlx::query_as::<_, DbRoutineItem>(
            r#"
            SELECT * FROM routine_items
            WHERE template_id = ? AND active = 1
            ORDER BY position, id
            "#,
        )
        .bind(&row.id)
        .fetch_all(pool)
        .await?;

        let children: Vec<String> = sqlx::query_scalar(
            "SELECT child_id FROM routine_assignments WHERE template_id = ? ORDER BY child_id",
        )
        .bind(&row.id)
        .fetch_all(pool)
        .await?;

        row.into_template(items, children)
    }

    async fn insert_item(
        tx: &mut Transaction<'static, Sqlite>,
        template_id: &str,
        position: i64,
        item: &RoutineItemWrite,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO routine_items (id, template_id, position, title, point_value, active)
            VALUES (?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(template_id)
        .bind(position)
        .bind(&item.title)
        .bind(item.point_value)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn replace_assignments(
        tx: &mut Transaction<'static, Sqlite>,
        template_id: &str,
        child_ids: &[String],
    ) -> Result<()> {
        sqlx::query("DELETE FROM routine_assignments WHERE template_id = ?")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        for child_id in child_ids {
            sqlx::query("INSERT OR IGNORE INTO routine_assignments (template_id, child_id) VALUES (?, ?)")
                .bind(template_id)
                .bind(child_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}
