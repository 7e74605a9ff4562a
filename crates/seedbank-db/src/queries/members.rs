use crate::connection::Database;
use crate::error::{DbError, Result};
use crate::models::{DbMember, NewMember};

pub struct MemberQueries;

impl MemberQueries {
    pub async fn create(db: &Database, member: NewMember) -> Result<DbMember> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            INSERT INTO members (id, family_id, name, role, avatar_tone, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.id)
        .bind(&member.family_id)
        .bind(&member.name)
        .bind(member.role.as_str())
        .bind(&member.avatar_tone)
        .bind(member.created_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Self::get_by_id(db, &member.id).await,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::Duplicate(format!("Member {} already exists", member.id)))
            }
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(DbError::NotFound(format!("Family {} not found", member.family_id)))
            }
            Err(e) => Err(DbError::Sqlx(e)),
        }
    }

    pub async fn get_by_id(db: &Database, id: &str) -> Result<DbMember> {
        Self::find(db, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Member {} not found", id)))
    }

    pub async fn find(db: &Database, id: &str) -> Result<Option<DbMember>> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbMember>("SELECT * FROM members WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(DbError::Sqlx)
    }

    pub async fn list_for_family(db: &Database, family_id: &str) -> Result<Vec<DbMember>> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbMember>(
            "SELECT * FROM members WHERE family_id = ? ORDER BY role DESC, name",
        )
        .bind(family_id)
        .fetch_all(pool)
        .await
        .map_err(DbError::Sqlx)
    }

    pub async fn list_children(db: &Database, family_id: &str) -> Result<Vec<DbMember>> {
        let pool = db.pool()?;

        sqlx::query_as::<_, DbMember>(
            "SELECT * FROM members WHERE family_id = ? AND role = 'CHILD' ORDER BY name",
        )
        .bind(family_id)
        .fetch_all(pool)
        .await
        .map_err(DbError::Sqlx)
    }
}
