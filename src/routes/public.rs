use crate::{
    AppState,
    handlers::{categories, post_types, posts, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only content access plus the session entry points. Soft-deleted posts are
/// filtered at the repository level, so nothing here can leak them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- Session ---
        .route("/users/register", post(users::register_user))
        .route("/users/login", post(users::login_user))
        // Guarded by the refresh cookie itself, checked inside the handler
        // against the token stored for the user.
        .route("/users/refresh_token", post(users::refresh_token))
        .route("/users/logout", post(users::logout_user))
        // --- Content ---
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", get(categories::get_category))
        .route("/post-types", get(post_types::list_post_types))
        .route("/post-types/{id}", get(post_types::get_post_type))
        .route("/posts", get(posts::list_posts))
        // GET /posts/main?categoryIds=1,2
        // The static segment wins over `{id}` in the matcher.
        .route("/posts/main", get(posts::get_main_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/images/{filename}", get(posts::get_image))
}
