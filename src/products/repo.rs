use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::categories::repo::UpdateOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub row_version: i64,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub user_id: Uuid,
}

/// Product row joined with its category, the category columns nulled out
/// when the category has been soft-deleted.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub row_version: i64,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub category_name: Option<String>,
    pub category_description: Option<String>,
}

const JOINED_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.price, p.image_url, p.is_active,
           p.is_deleted, p.row_version, p.created_at, p.category_id, p.user_id,
           c.name AS category_name, c.description AS category_description
    FROM products p
    LEFT JOIN product_categories c ON c.id = p.category_id AND NOT c.is_deleted
"#;

impl Product {
    pub async fn list_by_owner(
        db: &PgPool,
        owner: Uuid,
    ) -> anyhow::Result<Vec<ProductWithCategory>> {
        let sql = format!(
            "{JOINED_SELECT} WHERE p.user_id = $1 AND NOT p.is_deleted ORDER BY p.created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(owner)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Absent, foreign-owner and soft-deleted all come back as None.
    pub async fn get(
        db: &PgPool,
        owner: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<ProductWithCategory>> {
        let sql = format!("{JOINED_SELECT} WHERE p.id = $1 AND p.user_id = $2 AND NOT p.is_deleted");
        let row = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Owner, creation time and the live flag are stamped server-side.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
        is_active: bool,
        category_id: Uuid,
    ) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, image_url, is_active, category_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, price, image_url, is_active, is_deleted,
                      row_version, created_at, category_id, user_id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(is_active)
        .bind(category_id)
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Full-record overwrite; owner and creation time are immutable.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        db: &PgPool,
        owner: Uuid,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
        is_active: bool,
        category_id: Uuid,
        expected_version: i64,
    ) -> anyhow::Result<UpdateOutcome<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $4, description = $5, price = $6, image_url = $7,
                is_active = $8, category_id = $9, row_version = row_version + 1
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted AND row_version = $3
            RETURNING id, name, description, price, image_url, is_active, is_deleted,
                      row_version, created_at, category_id, user_id
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(expected_version)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(is_active)
        .bind(category_id)
        .fetch_optional(db)
        .await?;

        match row {
            Some(updated) => Ok(UpdateOutcome::Updated(updated)),
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM products
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

    /// Marks the row deleted without removing it. The second delete of an
    /// id finds no live row and returns false.
    pub async fn soft_delete(db: &PgPool, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
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
}
