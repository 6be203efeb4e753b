use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::Product;
use crate::database::products::ProductStore;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser};
use crate::validation::{validate_product, ProductDraft};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// GET /api/products?page=&limit=&search=
///
/// Offset-paginated listing of the caller's own products, newest first.
/// `total_count` covers the whole filter so clients can compute page
/// boundaries without a second request.
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<Value>, ApiError> {
    let pagination = &config::config().pagination;
    let page = params.page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = params
        .limit
        .filter(|l| *l >= 1)
        .unwrap_or(pagination.default_limit)
        .min(pagination.max_limit);

    let pool = DatabaseManager::pool().await?;
    let page_data = ProductStore::list(
        &pool,
        page,
        limit,
        params.search.as_deref(),
        Some(user.user_id),
    )
    .await?;

    Ok(ApiResponse::success(json!({
        "items": page_data.items,
        "total_count": page_data.total_count,
        "page": page,
        "limit": limit,
    })))
}

/// GET /api/products/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Product>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let product = ProductStore::get_by_id(&pool, id, user.user_id).await?;
    Ok(ApiResponse::success(product))
}

/// POST /api/products
///
/// Validation runs before the store is touched; the owner is stamped from
/// the session, never from the payload.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ProductDraft>,
) -> Result<ApiResponse<Product>, ApiError> {
    let form = validate_product(&draft)
        .map_err(|field_errors| ApiError::validation_error("Validation failed", field_errors))?;

    let pool = DatabaseManager::pool().await?;
    let product = ProductStore::insert(&pool, &form, user.user_id).await?;

    tracing::info!(product_id = %product.id, owner = %user.user_id, "created product");
    Ok(ApiResponse::created(product))
}

/// PUT /api/products/:id - Full replace of the mutable fields
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(draft): Json<ProductDraft>,
) -> Result<ApiResponse<()>, ApiError> {
    let form = validate_product(&draft)
        .map_err(|field_errors| ApiError::validation_error("Validation failed", field_errors))?;

    let pool = DatabaseManager::pool().await?;
    ProductStore::update(&pool, id, &form, user.user_id).await?;

    tracing::info!(product_id = %id, owner = %user.user_id, "updated product");
    Ok(ApiResponse::no_content())
}

/// DELETE /api/products/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    ProductStore::delete(&pool, id, user.user_id).await?;

    tracing::info!(product_id = %id, owner = %user.user_id, "deleted product");
    Ok(ApiResponse::no_content())
}
