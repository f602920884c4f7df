use axum::{extract::State, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_products: i64,
    pub total_categories: i64,
    pub active_products: i64,
    pub active_products_percentage: i64,
    pub total_inventory_value: Decimal,
    pub average_product_price: Decimal,
    pub recent_products: Vec<RecentProduct>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub category_name: Option<String>,
    pub owner_name: String,
}

#[derive(Debug, FromRow)]
struct ProductStats {
    total: i64,
    active: i64,
    total_value: Decimal,
    average_price: Decimal,
}

async fn product_stats(db: &PgPool, owner: Option<Uuid>) -> anyhow::Result<ProductStats> {
    let stats = match owner {
        Some(owner) => {
            sqlx::query_as::<_, ProductStats>(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE is_active) AS active,
                       COALESCE(SUM(price), 0) AS total_value,
                       COALESCE(AVG(price), 0) AS average_price
                FROM products
                WHERE NOT is_deleted AND user_id = $1
                "#,
            )
            .bind(owner)
            .fetch_one(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, ProductStats>(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE is_active) AS active,
                       COALESCE(SUM(price), 0) AS total_value,
                       COALESCE(AVG(price), 0) AS average_price
                FROM products
                WHERE NOT is_deleted
                "#,
            )
            .fetch_one(db)
            .await?
        }
    };
    Ok(stats)
}

async fn category_count(db: &PgPool, owner: Option<Uuid>) -> anyhow::Result<i64> {
    let count = match owner {
        Some(owner) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM product_categories WHERE NOT is_deleted AND user_id = $1",
            )
            .bind(owner)
            .fetch_one(db)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM product_categories WHERE NOT is_deleted",
            )
            .fetch_one(db)
            .await?
        }
    };
    Ok(count)
}

async fn recent_products(db: &PgPool, owner: Option<Uuid>) -> anyhow::Result<Vec<RecentProduct>> {
    const BASE: &str = r#"
        SELECT p.id, p.name, p.price, p.is_active, p.created_at,
               c.name AS category_name, u.full_name AS owner_name
        FROM products p
        LEFT JOIN product_categories c ON c.id = p.category_id AND NOT c.is_deleted
        JOIN users u ON u.id = p.user_id
    "#;
    let rows = match owner {
        Some(owner) => {
            let sql = format!(
                "{BASE} WHERE NOT p.is_deleted AND p.user_id = $1 ORDER BY p.created_at DESC LIMIT 5"
            );
            sqlx::query_as::<_, RecentProduct>(&sql)
                .bind(owner)
                .fetch_all(db)
                .await?
        }
        None => {
            let sql = format!("{BASE} WHERE NOT p.is_deleted ORDER BY p.created_at DESC LIMIT 5");
            sqlx::query_as::<_, RecentProduct>(&sql).fetch_all(db).await?
        }
    };
    Ok(rows)
}

/// Aggregate stats over live rows. Admin callers see every user's rows;
/// everyone else sees only their own.
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let owner = if caller.is_admin() { None } else { Some(caller.id) };

    let stats = product_stats(&state.db, owner).await?;
    let total_categories = category_count(&state.db, owner).await?;
    let recent = recent_products(&state.db, owner).await?;

    let percentage = if stats.total > 0 {
        ((stats.active as f64 / stats.total as f64) * 100.0).round() as i64
    } else {
        0
    };

    Ok(Json(DashboardResponse {
        total_products: stats.total,
        total_categories,
        active_products: stats.active,
        active_products_percentage: percentage,
        total_inventory_value: stats.total_value,
        average_product_price: stats.average_price,
        recent_products: recent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_response_serialization() {
        let response = DashboardResponse {
            total_products: 4,
            total_categories: 2,
            active_products: 3,
            active_products_percentage: 75,
            total_inventory_value: Decimal::new(10000, 2),
            average_product_price: Decimal::new(2500, 2),
            recent_products: vec![],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("totalProducts"));
        assert!(json.contains("activeProductsPercentage"));
        assert!(json.contains("\"recentProducts\":[]"));
    }
}
