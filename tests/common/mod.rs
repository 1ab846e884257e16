#![allow(dead_code)]

use async_trait::async_trait;
use blog_api::{
    AppConfig, AppState, MockCache, MockStorageService,
    cache::CacheState,
    models::{
        Category, CategoryOrder, CategoryRequest, CreatePostRequest, Post, PostCategoryEntry,
        PostType, PostTypeRequest, Role, UpdatePostRequest, User,
    },
    password::hash_password,
    repository::{RepoResult, Repository, RepositoryState},
    storage::StorageState,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Sup3rSecret!";

// --- In-memory Repository ---

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    post_types: Vec<PostType>,
    posts: Vec<Post>,
    post_categories: Vec<(i32, CategoryOrder)>,
    next_id: i32,
    // Monotonic clock so that creation order is observable in sorts.
    tick: i64,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000) + Duration::seconds(self.tick)
    }

    fn live_post(&self, id: i32) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id && !p.is_deleted())
    }
}

/// InMemoryRepository
///
/// Behaves like `PostgresRepository` for everything the service layer relies on:
/// soft-delete filtering, join-row counting, ordering and view increments.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    /// When true, `ping` fails as if the database were down.
    pub ping_fails: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_ping() -> Self {
        Self {
            ping_fails: true,
            ..Self::default()
        }
    }

    /// Seeds a user with `TEST_PASSWORD` and the given role.
    pub fn seed_user(&self, email: &str, role: Role) -> User {
        let hashed = hash_password(TEST_PASSWORD).unwrap();
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        let user = User {
            id: Uuid::new_v4(),
            username: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            password: hashed,
            role: role.as_str().to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        user
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    /// Raw row access, soft-deleted posts included.
    pub fn raw_post(&self, id: i32) -> Option<Post> {
        self.tables
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn positions(&self, post_id: i32) -> Vec<CategoryOrder> {
        self.tables
            .lock()
            .unwrap()
            .post_categories
            .iter()
            .filter(|(pid, _)| *pid == post_id)
            .map(|(_, order)| *order)
            .collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ping(&self) -> RepoResult<DateTime<Utc>> {
        if self.ping_fails {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(Utc::now())
    }

    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<User> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
            role: Role::User.as_str().to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> RepoResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self.tables.lock().unwrap().categories.clone())
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn insert_category(&self, req: &CategoryRequest) -> RepoResult<Category> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let now = tables.now();
        let category = Category {
            id,
            name: req.name.clone(),
            description: req.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        req: &CategoryRequest,
    ) -> RepoResult<Option<Category>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        Ok(tables.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = req.name.clone();
            c.description = req.description.clone();
            c.updated_at = now;
            c.clone()
        }))
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        tables.post_categories.retain(|(_, o)| o.category_id != id);
        Ok(tables.categories.len() < before)
    }

    async fn posts_in_category(&self, category_id: i32) -> RepoResult<Vec<Post>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<&(i32, CategoryOrder)> = tables
            .post_categories
            .iter()
            .filter(|(_, o)| o.category_id == category_id)
            .collect();
        rows.sort_by_key(|(_, o)| o.position);
        Ok(rows
            .into_iter()
            .filter_map(|(pid, _)| tables.live_post(*pid).cloned())
            .collect())
    }

    async fn list_post_types(&self) -> RepoResult<Vec<PostType>> {
        let mut types = self.tables.lock().unwrap().post_types.clone();
        types.sort_by_key(|t| (t.display_order, t.id));
        Ok(types)
    }

    async fn find_post_type(&self, id: i32) -> RepoResult<Option<PostType>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .post_types
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn insert_post_type(&self, req: &PostTypeRequest) -> RepoResult<PostType> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let now = tables.now();
        let post_type = PostType {
            id,
            name: req.name.clone(),
            description: req.description.clone(),
            display_order: req.order,
            created_at: now,
            updated_at: now,
        };
        tables.post_types.push(post_type.clone());
        Ok(post_type)
    }

    async fn update_post_type(
        &self,
        id: i32,
        req: &PostTypeRequest,
    ) -> RepoResult<Option<PostType>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        Ok(tables.post_types.iter_mut().find(|t| t.id == id).map(|t| {
            t.name = req.name.clone();
            t.description = req.description.clone();
            t.display_order = req.order;
            t.updated_at = now;
            t.clone()
        }))
    }

    async fn delete_post_type(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.post_types.len();
        tables.post_types.retain(|t| t.id != id);
        for post in tables.posts.iter_mut() {
            if post.post_type_id == Some(id) {
                post.post_type_id = None;
            }
        }
        Ok(tables.post_types.len() < before)
    }

    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .tables
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn count_category_entries(&self, category_id: i32) -> RepoResult<i64> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .post_categories
            .iter()
            .filter(|(_, o)| o.category_id == category_id)
            .count() as i64)
    }

    async fn insert_post(
        &self,
        author_id: Uuid,
        req: &CreatePostRequest,
        categories: &[CategoryOrder],
    ) -> RepoResult<Post> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let now = tables.now();
        let post = Post {
            id,
            title: req.title.clone(),
            subtitle: req.subtitle.clone(),
            content: req.content.clone(),
            video_url: req.video_url.clone(),
            published: req.published,
            published_date: req.published_date,
            author_id,
            post_type_id: req.post_type_id,
            thumbnail_image_url: req.thumbnail_image_url.clone(),
            views: 0,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        tables
            .post_categories
            .extend(categories.iter().map(|order| (id, *order)));
        Ok(post)
    }

    async fn find_post(&self, id: i32) -> RepoResult<Option<Post>> {
        Ok(self.tables.lock().unwrap().live_post(id).cloned())
    }

    async fn view_post(&self, id: i32) -> RepoResult<Option<Post>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && !p.is_deleted())
            .map(|p| {
                p.views += 1;
                p.clone()
            }))
    }

    async fn post_category_entries(&self, post_id: i32) -> RepoResult<Vec<PostCategoryEntry>> {
        let tables = self.tables.lock().unwrap();
        let mut entries: Vec<PostCategoryEntry> = tables
            .post_categories
            .iter()
            .filter(|(pid, _)| *pid == post_id)
            .filter_map(|(_, o)| {
                tables
                    .categories
                    .iter()
                    .find(|c| c.id == o.category_id)
                    .map(|c| PostCategoryEntry {
                        category_id: o.category_id,
                        name: c.name.clone(),
                        is_main: o.is_main,
                        position: o.position,
                    })
            })
            .collect();
        entries.sort_by_key(|e| e.category_id);
        Ok(entries)
    }

    async fn update_post(&self, id: i32, req: &UpdatePostRequest) -> RepoResult<Option<Post>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        Ok(tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && !p.is_deleted())
            .map(|p| {
                if let Some(title) = &req.title {
                    p.title = title.clone();
                }
                if let Some(subtitle) = &req.subtitle {
                    p.subtitle = Some(subtitle.clone());
                }
                if let Some(content) = &req.content {
                    p.content = content.clone();
                }
                if let Some(video_url) = &req.video_url {
                    p.video_url = Some(video_url.clone());
                }
                if let Some(published) = req.published {
                    p.published = published;
                }
                if let Some(date) = req.published_date {
                    p.published_date = Some(date);
                }
                if let Some(post_type_id) = req.post_type_id {
                    p.post_type_id = Some(post_type_id);
                }
                if let Some(url) = &req.thumbnail_image_url {
                    p.thumbnail_image_url = Some(url.clone());
                }
                p.updated_at = now;
                p.clone()
            }))
    }

    async fn delete_post_categories(&self, post_id: i32) -> RepoResult<()> {
        self.tables
            .lock()
            .unwrap()
            .post_categories
            .retain(|(pid, _)| *pid != post_id);
        Ok(())
    }

    async fn insert_post_categories(
        &self,
        post_id: i32,
        categories: &[CategoryOrder],
    ) -> RepoResult<()> {
        self.tables
            .lock()
            .unwrap()
            .post_categories
            .extend(categories.iter().map(|order| (post_id, *order)));
        Ok(())
    }

    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.now();
        match tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && !p.is_deleted())
        {
            Some(post) => {
                post.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn main_posts_for_category(
        &self,
        category_id: i32,
        limit: i64,
    ) -> RepoResult<Vec<Post>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<(i32, &Post)> = tables
            .post_categories
            .iter()
            .filter(|(_, o)| o.category_id == category_id && o.is_main)
            .filter_map(|(pid, o)| tables.live_post(*pid).map(|p| (o.position, p)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.created_at.cmp(&b.1.created_at)));
        Ok(rows
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

// --- State Helpers ---

/// Config used by the suites: plain-HTTP friendly cookies.
pub fn test_config() -> AppConfig {
    AppConfig {
        cookie_secure: false,
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    test_state_with(repo, MockStorageService::new(), MockCache::new())
}

pub fn test_state_with(
    repo: Arc<InMemoryRepository>,
    storage: MockStorageService,
    cache: MockCache,
) -> AppState {
    AppState::new(
        repo as RepositoryState,
        Arc::new(storage) as StorageState,
        Arc::new(cache) as CacheState,
        test_config(),
    )
}

pub fn post_request(title: &str, categories: &[(i32, bool)]) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: format!("{} body", title),
        categories: categories
            .iter()
            .map(|&(category_id, is_main)| blog_api::models::CategoryInput {
                category_id,
                is_main,
            })
            .collect(),
        ..CreatePostRequest::default()
    }
}
