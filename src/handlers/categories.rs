use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::parse_id;
use crate::{
    AppState,
    error::AppResult,
    models::{Category, CategoryDetail, CategoryRequest, CreatedId},
};

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.blog.list_categories().await?))
}

/// get_category
///
/// [Public Route] The category and its live posts, ordered by position.
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryDetail),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CategoryDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.category_detail(id).await?))
}

/// create_category
///
/// [Admin Route] Names are unique; a duplicate answers 409.
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = CreatedId),
        (status = 409, description = "Name already registered")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<CreatedId>)> {
    let category = state.blog.create_category(&payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedId { id: category.id })))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name owned by another category")
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.update_category(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state.blog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
