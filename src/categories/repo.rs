use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Outcome of a conditional update against the owner + version predicate.
/// Zero rows affected is re-checked once to tell a vanished row from a
/// concurrent writer; there is no automatic retry beyond that.
#[derive(Debug)]
pub enum UpdateOutcome<T> {
    Updated(T),
    NotFound,
    Conflict,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub is_deleted: bool,
    pub row_version: i64,
    pub created_at: OffsetDateTime,
}

impl Category {
    /// All live categories owned by the caller, newest first.
    pub async fn list_by_owner(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, user_id, is_deleted, row_version, created_at
            FROM product_categories
            WHERE user_id = $1 AND NOT is_deleted
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Foreign-owner and soft-deleted rows are both absent from this query,
    /// so the caller cannot tell them apart from a missing id.
    pub async fn get(db: &PgPool, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, user_id, is_deleted, row_version, created_at
            FROM product_categories
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Owner, creation time and the live flag are stamped here; whatever the
    /// client sent for them never reaches the row.
    pub async fn create(
        db: &PgPool,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO product_categories (name, description, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, user_id, is_deleted, row_version, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        owner: Uuid,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        expected_version: i64,
    ) -> anyhow::Result<UpdateOutcome<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            UPDATE product_categories
            SET name = $4, description = $5, row_version = row_version + 1
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted AND row_version = $3
            RETURNING id, name, description, user_id, is_deleted, row_version, created_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(expected_version)
        .bind(name)
        .bind(description)
        .fetch_optional(db)
        .await?;

        match row {
            Some(updated) => Ok(UpdateOutcome::Updated(updated)),
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM product_categories
                        WHERE id = $1 AND user_id = $2 AND NOT is_deleted
                    )
                    "#,
                )
                .bind(id)
                .bind(owner)
                .fetch_one(db)
                .await?;
                if exists {
                    Ok(UpdateOutcome::Conflict)
                } else {
                    Ok(UpdateOutcome::NotFound)
                }
            }
        }
    }

    /// Marks the row deleted without removing it. A second call finds no
    /// live row and returns false, which callers surface as not-found.
    pub async fn soft_delete(db: &PgPool, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE product_categories
            SET is_deleted = TRUE, row_version = row_version + 1
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Whether a live category with this id exists, regardless of owner.
    /// Used when validating product category references.
    pub async fn exists_active(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM product_categories WHERE id = $1 AND NOT is_deleted
            )
            "#,
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }
}
