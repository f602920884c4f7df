use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, FieldError},
    state::AppState,
};

use super::dto::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
use super::repo::{Category, UpdateOutcome};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/product-categories", get(list_categories).post(create_category))
        .route(
            "/product-categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

fn validate_name(name: &str) -> Result<(), ApiError> {
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
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let rows = Category::list_by_owner(&state.db, caller.id).await?;
    Ok(Json(rows.into_iter().map(CategoryResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = Category::get(&state.db, caller.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
    Ok(Json(category.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CategoryResponse>), ApiError> {
    validate_name(&payload.name)?;

    let category = Category::create(
        &state.db,
        caller.id,
        payload.name.trim(),
        payload.description.as_deref(),
    )
    .await?;

    info!(category_id = %category.id, user_id = %caller.id, "category created");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/api/product-categories/{}", category.id).parse().unwrap(),
    );
    Ok((StatusCode::CREATED, headers, Json(category.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<StatusCode, ApiError> {
    // rejected before any lookup
    if id != payload.id {
        return Err(ApiError::BadRequest("Id mismatch between URL and body".into()));
    }
    validate_name(&payload.name)?;

    match Category::update(
        &state.db,
        caller.id,
        id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.row_version,
    )
    .await?
    {
        UpdateOutcome::Updated(_) => {
            info!(category_id = %id, user_id = %caller.id, "category updated");
            Ok(StatusCode::NO_CONTENT)
        }
        UpdateOutcome::NotFound => Err(ApiError::NotFound("Category not found".into())),
        UpdateOutcome::Conflict => {
            warn!(category_id = %id, user_id = %caller.id, "category update conflict");
            Err(ApiError::Conflict("Category was modified concurrently".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if Category::soft_delete(&state.db, caller.id, id).await? {
        info!(category_id = %id, user_id = %caller.id, "category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Category not found".into()))
    }
}
