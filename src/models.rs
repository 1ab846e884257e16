use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field stored in `users.role`. Registration always assigns `User`;
/// `Admin` is granted out of band and unlocks the admin router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// User
///
/// The canonical identity row from `users`. Carries the bcrypt hash and the stored
/// refresh token, so it is never serialized; responses use `UserProfile`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // bcrypt hash, never the plain password.
    pub password: String,
    // 'USER' or 'ADMIN', enforced by a CHECK constraint.
    pub role: String,
    // Latest issued refresh token. Overwriting it revokes the previous one.
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Unknown role strings degrade to `Role::User`.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// UserProfile
///
/// Safe-to-share identity returned by `GET /api/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let role = user.role();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CategoryDetail
///
/// A category together with its live posts, ordered by their position in it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub category: Category,
    pub posts: Vec<Post>,
}

/// PostType
///
/// Classification axis for posts (e.g. "main" vs "normal" placement).
/// The SQL column is `display_order`; the JSON field is `order`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostType {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[serde(rename = "order")]
    pub display_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Post
///
/// A row from `posts`. `deleted_at` is the soft-delete marker; every normal read
/// filters on `deleted_at IS NULL`, so it is not part of the JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub video_url: Option<String>,
    pub published: bool,
    #[ts(type = "string | null")]
    pub published_date: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    pub post_type_id: Option<i32>,
    pub thumbnail_image_url: Option<String>,
    pub views: i32,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// PostCategoryEntry
///
/// One join row of `post_categories`, enriched with the category name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostCategoryEntry {
    pub category_id: i32,
    pub name: String,
    pub is_main: bool,
    pub position: i32,
}

/// PostDetail
///
/// Response of `GET /api/posts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub post: Post,
    pub categories: Vec<PostCategoryEntry>,
    pub post_type: Option<PostType>,
}

/// CategoryOrder
///
/// A join row about to be written: the computed position of a post inside one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryOrder {
    pub category_id: i32,
    pub position: i32,
    pub is_main: bool,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "jane")]
    pub username: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "Sup3rSecret!")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CategoryRequest
///
/// Body of both `POST` and `PUT /api/categories`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryRequest {
    #[schema(example = "Technology")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i32,
}

/// CategoryInput
///
/// A category membership requested for a post. The position is assigned server side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryInput {
    pub category_id: i32,
    #[serde(default)]
    pub is_main: bool,
}

/// CreatePostRequest
///
/// Input payload for `POST /api/posts`. The author is the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[ts(type = "string | null")]
    pub published_date: Option<DateTime<Utc>>,
    pub post_type_id: Option<i32>,
    pub thumbnail_image_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryInput>,
}

/// UpdatePostRequest
///
/// Partial update for `PUT /api/posts/{id}`: absent fields keep their value.
/// Supplying `categories` replaces the whole membership set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub published: Option<bool>,
    #[ts(type = "string | null")]
    pub published_date: Option<DateTime<Utc>>,
    pub post_type_id: Option<i32>,
    pub thumbnail_image_url: Option<String>,
    pub categories: Option<Vec<CategoryInput>>,
}

// --- Response Payloads ---

/// LoginResponse
///
/// The refresh token is also set as an HTTP-only cookie on the same response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshResponse {
    pub token: String,
}

/// Id of a newly created category, post type or post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedId {
    pub id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisteredUser {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageUploadResponse {
    #[schema(example = "http://localhost:8000/api/posts/images/1718000000000.png")]
    pub url: String,
}

/// HealthResponse
///
/// `postgres` is the server time returned by the probe query; `redis` echoes the probe value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    #[ts(type = "string")]
    pub postgres: DateTime<Utc>,
    pub redis: String,
}
