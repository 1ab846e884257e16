use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::parse_id;
use crate::{
    AppState,
    error::AppResult,
    models::{PostType, PostTypeRequest},
};

/// list_post_types
///
/// [Public Route] Ordered by display order.
#[utoipa::path(
    get,
    path = "/api/post-types",
    tag = "post-types",
    responses((status = 200, description = "All post types", body = [PostType]))
)]
pub async fn list_post_types(State(state): State<AppState>) -> AppResult<Json<Vec<PostType>>> {
    Ok(Json(state.blog.list_post_types().await?))
}

#[utoipa::path(
    get,
    path = "/api/post-types/{id}",
    tag = "post-types",
    params(("id" = i32, Path, description = "Post type ID")),
    responses(
        (status = 200, description = "Found", body = PostType),
        (status = 404, description = "Post type not found")
    )
)]
pub async fn get_post_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostType>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.post_type(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/post-types",
    tag = "post-types",
    security(("bearer_auth" = [])),
    request_body = PostTypeRequest,
    responses((status = 201, description = "Created", body = PostType))
)]
pub async fn create_post_type(
    State(state): State<AppState>,
    Json(payload): Json<PostTypeRequest>,
) -> AppResult<(StatusCode, Json<PostType>)> {
    let post_type = state.blog.create_post_type(&payload).await?;
    Ok((StatusCode::CREATED, Json(post_type)))
}

#[utoipa::path(
    put,
    path = "/api/post-types/{id}",
    tag = "post-types",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Post type ID")),
    request_body = PostTypeRequest,
    responses(
        (status = 200, description = "Updated", body = PostType),
        (status = 404, description = "Post type not found")
    )
)]
pub async fn update_post_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PostTypeRequest>,
) -> AppResult<Json<PostType>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.update_post_type(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/post-types/{id}",
    tag = "post-types",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Post type ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Post type not found")
    )
)]
pub async fn delete_post_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state.blog.delete_post_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
