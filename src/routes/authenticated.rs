use crate::{
    AppState,
    handlers::{posts, users},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Upper bound for a single image upload.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`, resolved from the Bearer
/// header or the refresh cookie. Ownership rules (post edits) are enforced in
/// `BlogService`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/users/me", get(users::get_me))
        .route("/posts", post(posts::create_post))
        // Author or admin only.
        .route("/posts/{id}", put(posts::update_post))
        .route(
            "/posts/images",
            post(posts::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}
