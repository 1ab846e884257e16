use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Category, CategoryDetail, CategoryInput, CategoryOrder, CategoryRequest,
        CreatePostRequest, LoginRequest, LoginResponse, Post, PostDetail, PostType,
        PostTypeRequest, RegisterRequest, UpdatePostRequest, User, UserProfile,
    },
    password::{hash_password, is_email_valid, is_password_valid, verify_password},
    repository::RepositoryState,
    tokens::TokenService,
};

/// Tokens minted by a successful refresh.
#[derive(Debug, Clone)]
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// BlogService
///
/// The entity rules that sit between the HTTP handlers and the `Repository`:
/// uniqueness checks, position assignment, permission checks and token rotation.
/// Cheap to clone; it only holds shared handles.
#[derive(Clone)]
pub struct BlogService {
    repo: RepositoryState,
    tokens: TokenService,
    main_posts_limit: i64,
}

impl BlogService {
    pub fn new(repo: RepositoryState, tokens: TokenService, main_posts_limit: i64) -> Self {
        Self {
            repo,
            tokens,
            main_posts_limit,
        }
    }

    // --- Users ---

    /// register
    ///
    /// Rejects a malformed email or weak password with `Validation` and an already
    /// registered email with `Conflict`. New users always get role `USER`.
    pub async fn register(&self, req: &RegisterRequest) -> AppResult<Uuid> {
        if req.username.trim().is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        if !is_email_valid(&req.email) {
            return Err(AppError::validation("Invalid email format"));
        }
        if !is_password_valid(&req.password) {
            return Err(AppError::validation(
                "Password must be 10-20 characters and include a digit, a lowercase letter, \
                 an uppercase letter and one of !@#$%^&*",
            ));
        }
        if self.repo.find_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }

        let hashed = hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;
        let user = self
            .repo
            .insert_user(req.username.trim(), &req.email, &hashed)
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user.id)
    }

    /// login
    ///
    /// Issues an access/refresh pair and stores the refresh token on the user row,
    /// revoking whatever was stored before.
    pub async fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        if !is_email_valid(&req.email) {
            return Err(AppError::validation("Invalid email format"));
        }

        let user = self
            .repo
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

        if !verify_password(&req.password, &user.password) {
            tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let rotated = self.rotate(&user).await?;
        Ok(LoginResponse {
            access_token: rotated.access_token,
            refresh_token: rotated.refresh_token,
        })
    }

    /// refresh
    ///
    /// 401 without a token, 403 when it fails verification or is not the one stored
    /// for the user, 404 when the user no longer exists.
    pub async fn refresh(&self, presented: Option<&str>) -> AppResult<RotatedTokens> {
        let token = presented.ok_or_else(|| AppError::unauthorized("No token provided"))?;

        let claims = self
            .tokens
            .verify_refresh(token)
            .ok_or_else(|| AppError::forbidden("Invalid refresh token"))?;

        let user = self
            .repo
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if user.refresh_token.as_deref() != Some(token) {
            tracing::debug!(user_id = %user.id, "refresh rejected: token was rotated");
            return Err(AppError::forbidden("Invalid refresh token"));
        }

        self.rotate(&user).await
    }

    /// Drops the stored refresh token when the presented one verifies.
    pub async fn logout(&self, presented: Option<&str>) -> AppResult<()> {
        if let Some(claims) = presented.and_then(|token| self.tokens.verify_refresh(token)) {
            self.repo.set_refresh_token(claims.sub, None).await?;
        }
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn rotate(&self, user: &User) -> AppResult<RotatedTokens> {
        let access_token = self
            .tokens
            .issue_access_token(user)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(user.id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        self.repo
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        Ok(RotatedTokens {
            access_token,
            refresh_token,
        })
    }

    // --- Categories ---

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.repo.list_categories().await?)
    }

    pub async fn category_detail(&self, id: i32) -> AppResult<CategoryDetail> {
        let category = self
            .repo
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::not_found("Category not found"))?;
        let posts = self.repo.posts_in_category(id).await?;
        Ok(CategoryDetail { category, posts })
    }

    pub async fn create_category(&self, req: &CategoryRequest) -> AppResult<Category> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("Category name is required"));
        }
        if self.repo.find_category_by_name(&req.name).await?.is_some() {
            return Err(AppError::conflict("Category name already registered"));
        }
        Ok(self.repo.insert_category(req).await?)
    }

    pub async fn update_category(&self, id: i32, req: &CategoryRequest) -> AppResult<Category> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("Category name is required"));
        }
        if let Some(owner) = self.repo.find_category_by_name(&req.name).await? {
            if owner.id != id {
                return Err(AppError::conflict("Category name already registered"));
            }
        }
        self.repo
            .update_category(id, req)
            .await?
            .ok_or_else(|| AppError::not_found("Category not found"))
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        if self.repo.delete_category(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Category not found"))
        }
    }

    // --- Post types ---

    pub async fn list_post_types(&self) -> AppResult<Vec<PostType>> {
        Ok(self.repo.list_post_types().await?)
    }

    pub async fn post_type(&self, id: i32) -> AppResult<PostType> {
        self.repo
            .find_post_type(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post type not found"))
    }

    pub async fn create_post_type(&self, req: &PostTypeRequest) -> AppResult<PostType> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("Post type name is required"));
        }
        Ok(self.repo.insert_post_type(req).await?)
    }

    pub async fn update_post_type(&self, id: i32, req: &PostTypeRequest) -> AppResult<PostType> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("Post type name is required"));
        }
        self.repo
            .update_post_type(id, req)
            .await?
            .ok_or_else(|| AppError::not_found("Post type not found"))
    }

    pub async fn delete_post_type(&self, id: i32) -> AppResult<()> {
        if self.repo.delete_post_type(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Post type not found"))
        }
    }

    // --- Posts ---

    pub async fn list_posts(&self) -> AppResult<Vec<Post>> {
        Ok(self.repo.list_posts().await?)
    }

    /// create_post
    ///
    /// Each requested category gets position `count + 1`, where `count` includes the
    /// rows of soft-deleted posts. Counting and inserting are not serialized against
    /// concurrent creates in the same category.
    pub async fn create_post(&self, author_id: Uuid, req: &CreatePostRequest) -> AppResult<i32> {
        if req.title.trim().is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if let Some(post_type_id) = req.post_type_id {
            self.post_type(post_type_id).await?;
        }

        self.check_categories(&req.categories).await?;
        let orders = self.assign_positions(&req.categories).await?;
        let post = self.repo.insert_post(author_id, req, &orders).await?;

        tracing::info!(post_id = post.id, author_id = %author_id, "post created");
        Ok(post.id)
    }

    /// find_post
    ///
    /// Counts as a view: every successful call increments `views` by exactly one.
    pub async fn find_post(&self, id: i32) -> AppResult<PostDetail> {
        let post = self
            .repo
            .view_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        self.detail(post).await
    }

    /// update_post
    ///
    /// Only the author or an admin may edit. When `categories` is present the whole
    /// membership set is deleted and recreated with fresh positions.
    pub async fn update_post(
        &self,
        caller: Uuid,
        id: i32,
        req: &UpdatePostRequest,
    ) -> AppResult<PostDetail> {
        let existing = self
            .repo
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;

        if existing.author_id != caller {
            let is_admin = self
                .repo
                .find_user_by_id(caller)
                .await?
                .is_some_and(|user| user.is_admin());
            if !is_admin {
                return Err(AppError::forbidden("Only the author or an admin can edit this post"));
            }
        }

        if let Some(post_type_id) = req.post_type_id {
            self.post_type(post_type_id).await?;
        }
        if let Some(categories) = &req.categories {
            self.check_categories(categories).await?;
        }

        let post = self
            .repo
            .update_post(id, req)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;

        if let Some(categories) = &req.categories {
            // Counted while the post's own rows still exist, so a post kept in a
            // category moves past its current last position.
            let orders = self.assign_positions(categories).await?;
            self.repo.delete_post_categories(id).await?;
            self.repo.insert_post_categories(id, &orders).await?;
        }

        self.detail(post).await
    }

    pub async fn delete_post(&self, id: i32) -> AppResult<()> {
        if self.repo.soft_delete_post(id).await? {
            tracing::info!(post_id = id, "post soft-deleted");
            Ok(())
        } else {
            Err(AppError::not_found("Post not found"))
        }
    }

    /// main_posts
    ///
    /// Up to the configured number of `is_main` posts per requested category. Categories
    /// without any such post are left out, so no match yields an empty map.
    pub async fn main_posts(&self, category_ids: &[i32]) -> AppResult<BTreeMap<i32, Vec<Post>>> {
        let mut result = BTreeMap::new();
        for &category_id in category_ids.iter().collect::<BTreeSet<_>>() {
            let posts = self
                .repo
                .main_posts_for_category(category_id, self.main_posts_limit)
                .await?;
            if !posts.is_empty() {
                result.insert(category_id, posts);
            }
        }
        Ok(result)
    }

    async fn detail(&self, post: Post) -> AppResult<PostDetail> {
        let categories = self.repo.post_category_entries(post.id).await?;
        let post_type = match post.post_type_id {
            Some(post_type_id) => self.repo.find_post_type(post_type_id).await?,
            None => None,
        };
        Ok(PostDetail {
            post,
            categories,
            post_type,
        })
    }

    async fn check_categories(&self, categories: &[CategoryInput]) -> AppResult<()> {
        if categories.is_empty() {
            return Err(AppError::validation("At least one category is required"));
        }

        let mut seen = BTreeSet::new();
        for input in categories {
            if !seen.insert(input.category_id) {
                return Err(AppError::validation(format!(
                    "Category {} listed more than once",
                    input.category_id
                )));
            }
            if self.repo.find_category(input.category_id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Category {} not found",
                    input.category_id
                )));
            }
        }
        Ok(())
    }

    async fn assign_positions(&self, categories: &[CategoryInput]) -> AppResult<Vec<CategoryOrder>> {
        let mut orders = Vec::with_capacity(categories.len());
        for input in categories {
            let count = self.repo.count_category_entries(input.category_id).await?;
            orders.push(CategoryOrder {
                category_id: input.category_id,
                position: (count + 1) as i32,
                is_main: input.is_main,
            });
        }
        Ok(orders)
    }
}
