use crate::models::{
    Category, CategoryOrder, CategoryRequest, CreatePostRequest, Post, PostCategoryEntry,
    PostType, PostTypeRequest, UpdatePostRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

const USER_COLUMNS: &str =
    "id, username, email, password, role, refresh_token, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";
const POST_TYPE_COLUMNS: &str = "id, name, description, display_order, created_at, updated_at";
const POST_COLUMNS: &str = "p.id, p.title, p.subtitle, p.content, p.video_url, p.published, \
     p.published_date, p.author_id, p.post_type_id, p.thumbnail_image_url, p.views, \
     p.deleted_at, p.created_at, p.updated_at";

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers and the
/// service layer talk to this trait only, so tests can run against an in-memory
/// implementation.
///
/// Every method surfaces `sqlx::Error` unchanged; the conversion into an HTTP status
/// happens once, in `AppError`.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Liveness probe: the database server's current time.
    async fn ping(&self) -> RepoResult<DateTime<Utc>>;

    // --- Users ---
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Inserts with role `USER`.
    async fn insert_user(&self, username: &str, email: &str, password_hash: &str)
    -> RepoResult<User>;
    /// Overwrites (or clears) the stored refresh token.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> RepoResult<()>;

    // --- Categories ---
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>>;
    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    async fn insert_category(&self, req: &CategoryRequest) -> RepoResult<Category>;
    async fn update_category(&self, id: i32, req: &CategoryRequest)
    -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: i32) -> RepoResult<bool>;
    /// Live posts of a category, ordered by their position in it.
    async fn posts_in_category(&self, category_id: i32) -> RepoResult<Vec<Post>>;

    // --- Post types ---
    /// Ordered by display order.
    async fn list_post_types(&self) -> RepoResult<Vec<PostType>>;
    async fn find_post_type(&self, id: i32) -> RepoResult<Option<PostType>>;
    async fn insert_post_type(&self, req: &PostTypeRequest) -> RepoResult<PostType>;
    async fn update_post_type(&self, id: i32, req: &PostTypeRequest)
    -> RepoResult<Option<PostType>>;
    async fn delete_post_type(&self, id: i32) -> RepoResult<bool>;

    // --- Posts ---
    /// Live posts, newest first.
    async fn list_posts(&self) -> RepoResult<Vec<Post>>;
    /// Number of join rows for a category, soft-deleted posts included.
    async fn count_category_entries(&self, category_id: i32) -> RepoResult<i64>;
    /// Inserts the post and its join rows in one transaction.
    async fn insert_post(
        &self,
        author_id: Uuid,
        req: &CreatePostRequest,
        categories: &[CategoryOrder],
    ) -> RepoResult<Post>;
    /// Live post without side effects.
    async fn find_post(&self, id: i32) -> RepoResult<Option<Post>>;
    /// Increments `views` by one and returns the updated live post.
    async fn view_post(&self, id: i32) -> RepoResult<Option<Post>>;
    async fn post_category_entries(&self, post_id: i32) -> RepoResult<Vec<PostCategoryEntry>>;
    /// Overwrites the fields present in `req`; absent fields keep their value.
    async fn update_post(&self, id: i32, req: &UpdatePostRequest) -> RepoResult<Option<Post>>;
    async fn delete_post_categories(&self, post_id: i32) -> RepoResult<()>;
    async fn insert_post_categories(
        &self,
        post_id: i32,
        categories: &[CategoryOrder],
    ) -> RepoResult<()>;
    /// Sets `deleted_at`. `false` when the post is missing or already deleted.
    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool>;
    /// Up to `limit` live `is_main` posts of a category, by position then creation time.
    async fn main_posts_for_category(&self, category_id: i32, limit: i64)
    -> RepoResult<Vec<Post>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_join_rows(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i32,
    categories: &[CategoryOrder],
) -> RepoResult<()> {
    for entry in categories {
        sqlx::query(
            "INSERT INTO post_categories (post_id, category_id, is_main, position) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(post_id)
        .bind(entry.category_id)
        .bind(entry.is_main)
        .bind(entry.position)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn ping(&self) -> RepoResult<DateTime<Utc>> {
        sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&self.pool)
            .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password, role) \
             VALUES ($1, $2, $3, $4, 'USER') RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> RepoResult<()> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_category(&self, req: &CategoryRequest) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, description) VALUES ($1, $2) \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&req.name)
        .bind(&req.description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(
        &self,
        id: i32,
        req: &CategoryRequest,
    ) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn posts_in_category(&self, category_id: i32) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             JOIN post_categories pc ON pc.post_id = p.id \
             WHERE pc.category_id = $1 AND p.deleted_at IS NULL \
             ORDER BY pc.position"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_post_types(&self) -> RepoResult<Vec<PostType>> {
        sqlx::query_as::<_, PostType>(&format!(
            "SELECT {POST_TYPE_COLUMNS} FROM post_types ORDER BY display_order, id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn find_post_type(&self, id: i32) -> RepoResult<Option<PostType>> {
        sqlx::query_as::<_, PostType>(&format!(
            "SELECT {POST_TYPE_COLUMNS} FROM post_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_post_type(&self, req: &PostTypeRequest) -> RepoResult<PostType> {
        sqlx::query_as::<_, PostType>(&format!(
            "INSERT INTO post_types (name, description, display_order) VALUES ($1, $2, $3) \
             RETURNING {POST_TYPE_COLUMNS}"
        ))
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.order)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_post_type(
        &self,
        id: i32,
        req: &PostTypeRequest,
    ) -> RepoResult<Option<PostType>> {
        sqlx::query_as::<_, PostType>(&format!(
            "UPDATE post_types SET name = $2, description = $3, display_order = $4, \
             updated_at = NOW() WHERE id = $1 RETURNING {POST_TYPE_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.order)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_post_type(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM post_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.deleted_at IS NULL \
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn count_category_entries(&self, category_id: i32) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM post_categories WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
    }

    /// insert_post
    ///
    /// The post row and its join rows commit together; a failing join insert (e.g. an
    /// unknown category) leaves no orphan post behind.
    async fn insert_post(
        &self,
        author_id: Uuid,
        req: &CreatePostRequest,
        categories: &[CategoryOrder],
    ) -> RepoResult<Post> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts AS p (title, subtitle, content, video_url, published, \
             published_date, author_id, post_type_id, thumbnail_image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {POST_COLUMNS}"
        ))
        .bind(&req.title)
        .bind(&req.subtitle)
        .bind(&req.content)
        .bind(&req.video_url)
        .bind(req.published)
        .bind(req.published_date)
        .bind(author_id)
        .bind(req.post_type_id)
        .bind(&req.thumbnail_image_url)
        .fetch_one(&mut *tx)
        .await?;

        insert_join_rows(&mut tx, post.id, categories).await?;
        tx.commit().await?;

        Ok(post)
    }

    async fn find_post(&self, id: i32) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1 AND p.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn view_post(&self, id: i32) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts AS p SET views = p.views + 1 \
             WHERE p.id = $1 AND p.deleted_at IS NULL RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn post_category_entries(&self, post_id: i32) -> RepoResult<Vec<PostCategoryEntry>> {
        sqlx::query_as::<_, PostCategoryEntry>(
            "SELECT pc.category_id, c.name, pc.is_main, pc.position \
             FROM post_categories pc JOIN categories c ON c.id = pc.category_id \
             WHERE pc.post_id = $1 ORDER BY pc.category_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    /// update_post
    ///
    /// Uses COALESCE so that a `None` field leaves the stored column untouched.
    async fn update_post(&self, id: i32, req: &UpdatePostRequest) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts AS p SET \
             title = COALESCE($2, p.title), \
             subtitle = COALESCE($3, p.subtitle), \
             content = COALESCE($4, p.content), \
             video_url = COALESCE($5, p.video_url), \
             published = COALESCE($6, p.published), \
             published_date = COALESCE($7, p.published_date), \
             post_type_id = COALESCE($8, p.post_type_id), \
             thumbnail_image_url = COALESCE($9, p.thumbnail_image_url), \
             updated_at = NOW() \
             WHERE p.id = $1 AND p.deleted_at IS NULL RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.title)
        .bind(&req.subtitle)
        .bind(&req.content)
        .bind(&req.video_url)
        .bind(req.published)
        .bind(req.published_date)
        .bind(req.post_type_id)
        .bind(&req.thumbnail_image_url)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_post_categories(&self, post_id: i32) -> RepoResult<()> {
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_post_categories(
        &self,
        post_id: i32,
        categories: &[CategoryOrder],
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_join_rows(&mut tx, post_id, categories).await?;
        tx.commit().await
    }

    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn main_posts_for_category(
        &self,
        category_id: i32,
        limit: i64,
    ) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             JOIN post_categories pc ON pc.post_id = p.id \
             WHERE pc.category_id = $1 AND pc.is_main AND p.deleted_at IS NULL \
             ORDER BY pc.position, p.created_at \
             LIMIT $2"
        ))
        .bind(category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
