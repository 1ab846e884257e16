use std::{collections::BTreeMap, io, path::Path as FsPath};

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use super::parse_id;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{CreatePostRequest, CreatedId, ImageUploadResponse, Post, PostDetail, UpdatePostRequest},
    storage::{StorageState, is_safe_filename},
};

/// Multipart field carrying the uploaded file.
pub const IMAGE_FIELD: &str = "image";

/// MainPostsQuery
///
/// `?categoryIds=1,2,3`. Missing or empty means no categories.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MainPostsQuery {
    /// Comma-separated category ids.
    pub category_ids: Option<String>,
}

impl MainPostsQuery {
    pub fn ids(&self) -> AppResult<Vec<i32>> {
        match self.category_ids.as_deref().map(str::trim) {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => raw.split(',').map(parse_id).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    responses((status = 200, description = "Live posts, newest first", body = [Post]))
)]
pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.blog.list_posts().await?))
}

/// get_post
///
/// [Public Route] Each successful read increments the view counter.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Missing or soft-deleted")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.find_post(id).await?))
}

/// get_main_posts
///
/// [Public Route] Highlighted posts keyed by category id. Categories with no
/// highlighted post are omitted.
#[utoipa::path(
    get,
    path = "/api/posts/main",
    tag = "posts",
    params(MainPostsQuery),
    responses(
        (status = 200, description = "Main posts per category", body = std::collections::HashMap<String, Vec<Post>>),
        (status = 400, description = "Malformed category id")
    )
)]
pub async fn get_main_posts(
    State(state): State<AppState>,
    Query(query): Query<MainPostsQuery>,
) -> AppResult<Json<BTreeMap<i32, Vec<Post>>>> {
    let ids = query.ids()?;
    Ok(Json(state.blog.main_posts(&ids).await?))
}

/// create_post
///
/// [Authenticated Route] The caller becomes the author. At least one category is
/// required; positions are assigned per category.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    security(("bearer_auth" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = CreatedId),
        (status = 400, description = "Empty category list"),
        (status = 404, description = "Unknown category or post type")
    )
)]
pub async fn create_post(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<CreatedId>)> {
    let id = state.blog.create_post(author_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedId { id })))
}

/// update_post
///
/// [Authenticated Route] Partial update, author or admin only.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostDetail),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(
    AuthUser { id: caller, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<Json<PostDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(state.blog.update_post(caller, id, &payload).await?))
}

/// delete_post
///
/// [Admin Route] Soft delete: the row stays, every read stops returning it.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Soft-deleted"),
        (status = 404, description = "Missing or already deleted")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state.blog.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// upload_image
///
/// [Authenticated Route] Stores the `image` multipart field as `<unix-millis>.<ext>`
/// and returns its public URL.
#[utoipa::path(
    post,
    path = "/api/posts/images",
    tag = "posts",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "Field `image`"),
    responses(
        (status = 201, description = "Stored", body = ImageUploadResponse),
        (status = 400, description = "Missing image field")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImageUploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| FsPath::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .or_else(|| {
                field
                    .content_type()
                    .and_then(mime_guess::get_mime_extensions_str)
                    .and_then(|exts| exts.first())
                    .map(|ext| ext.to_string())
            })
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        let filename = store_unique(
            &state.storage,
            Utc::now().timestamp_millis(),
            extension.as_deref(),
            &bytes,
        )
        .await?;

        tracing::info!(filename = %filename, size = bytes.len(), "image uploaded");
        let url = format!(
            "{}/api/posts/images/{}",
            state.config.public_base_url.trim_end_matches('/'),
            filename
        );
        return Ok((StatusCode::CREATED, Json(ImageUploadResponse { url })));
    }

    Err(AppError::validation(format!(
        "Multipart field '{}' is required",
        IMAGE_FIELD
    )))
}

/// get_image
///
/// [Public Route] Serves an uploaded file with a content type guessed from its name.
#[utoipa::path(
    get,
    path = "/api/posts/images/{filename}",
    tag = "posts",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 400, description = "Rejected file name"),
        (status = 404, description = "No such image")
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    if !is_safe_filename(&filename) {
        return Err(AppError::validation("Invalid file name"));
    }

    let bytes = state.storage.load(&filename).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::not_found("Image not found"),
        _ => AppError::from(e),
    })?;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], Bytes::from(bytes)))
}

/// Uploads landing in the same millisecond get `-1`, `-2`, ... appended.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// `<unix-millis>[-<attempt>].<ext>`, or without the extension when it is unknown.
pub fn stored_filename(unix_millis: i64, attempt: u32, extension: Option<&str>) -> String {
    let stem = match attempt {
        0 => unix_millis.to_string(),
        n => format!("{}-{}", unix_millis, n),
    };
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}

/// store_unique
///
/// Saves `bytes` under the first free timestamp name and returns it. Existing files
/// are never overwritten.
pub async fn store_unique(
    storage: &StorageState,
    unix_millis: i64,
    extension: Option<&str>,
    bytes: &[u8],
) -> AppResult<String> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let filename = stored_filename(unix_millis, attempt, extension);
        match storage.save(&filename, bytes).await {
            Ok(()) => return Ok(filename),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(format!(
        "no free file name for timestamp {}",
        unix_millis
    )))
}
