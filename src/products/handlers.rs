use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    categories::repo::{Category, UpdateOutcome},
    error::{ApiError, FieldError},
    state::AppState,
};

use super::dto::{CreateProductRequest, ProductResponse, UpdateProductRequest};
use super::repo::Product;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn validate_product(name: &str, price: Decimal) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "Name is required".into(),
        });
    } else if name.trim().chars().count() > 100 {
        errors.push(FieldError {
            field: "name",
            message: "Name cannot exceed 100 characters".into(),
        });
    }
    if price < Decimal::ZERO {
        errors.push(FieldError {
            field: "price",
            message: "Price cannot be negative".into(),
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// The referenced category must be live, but it is not required to belong
/// to the caller.
async fn check_category_reference(state: &AppState, category_id: Uuid) -> Result<(), ApiError> {
    if Category::exists_active(&state.db, category_id).await? {
        Ok(())
    } else {
        Err(ApiError::invalid("categoryId", "Unknown category"))
    }
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let rows = Product::list_by_owner(&state.db, caller.id).await?;
    Ok(Json(rows.into_iter().map(ProductResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = Product::get(&state.db, caller.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ProductResponse>), ApiError> {
    validate_product(&payload.name, payload.price)?;
    check_category_reference(&state, payload.category_id).await?;

    let product = Product::create(
        &state.db,
        caller.id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.price,
        payload.image_url.as_deref(),
        payload.is_active,
        payload.category_id,
    )
    .await?;

    info!(product_id = %product.id, user_id = %caller.id, "product created");

    // re-read through the joined query so the response embeds the category
    let created = Product::get(&state.db, caller.id, product.id)
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("created product missing")))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/api/products/{}", product.id).parse().unwrap(),
    );
    Ok((StatusCode::CREATED, headers, Json(created.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<StatusCode, ApiError> {
    // rejected before any lookup
    if id != payload.id {
        return Err(ApiError::BadRequest("Id mismatch between URL and body".into()));
    }
    validate_product(&payload.name, payload.price)?;
    check_category_reference(&state, payload.category_id).await?;

    match Product::update(
        &state.db,
        caller.id,
        id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.price,
        payload.image_url.as_deref(),
        payload.is_active,
        payload.category_id,
        payload.row_version,
    )
    .await?
    {
        UpdateOutcome::Updated(_) => {
            info!(product_id = %id, user_id = %caller.id, "product updated");
            Ok(StatusCode::NO_CONTENT)
        }
        UpdateOutcome::NotFound => Err(ApiError::NotFound("Product not found".into())),
        UpdateOutcome::Conflict => {
            warn!(product_id = %id, user_id = %caller.id, "product update conflict");
            Err(ApiError::Conflict("Product was modified concurrently".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if Product::soft_delete(&state.db, caller.id, id).await? {
        info!(product_id = %id, user_id = %caller.id, "product deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Product not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_validation_collects_field_errors() {
        let err = validate_product("", Decimal::new(-1, 0)).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "name");
                assert_eq!(errors[1].field, "price");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn product_validation_accepts_free_product() {
        assert!(validate_product("Sample", Decimal::ZERO).is_ok());
    }

    #[test]
    fn product_validation_rejects_long_name() {
        let name = "x".repeat(101);
        assert!(validate_product(&name, Decimal::ONE).is_err());
        let name = "x".repeat(100);
        assert!(validate_product(&name, Decimal::ONE).is_ok());
    }
}
