use crate::{
    AppState,
    handlers::{categories, post_types, posts},
};
use axum::{
    Router,
    routing::{delete, post, put},
};

/// Admin Router Module
///
/// Content management endpoints. The whole router is wrapped in the role gate,
/// which costs one user lookup per request and rejects non-admins with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/post-types", post(post_types::create_post_type))
        .route(
            "/post-types/{id}",
            put(post_types::update_post_type).delete(post_types::delete_post_type),
        )
        // Soft delete.
        .route("/posts/{id}", delete(posts::delete_post))
}
