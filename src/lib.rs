use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod shutdown;
pub mod storage;
pub mod tokens;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{AdminUser, AuthUser};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use cache::{CacheState, MockCache, RedisCache};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use service::BlogService;
pub use storage::{LocalStorage, MockStorageService, StorageState};
pub use tokens::TokenService;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json` and rendered by Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::login_user,
        handlers::users::refresh_token, handlers::users::logout_user, handlers::users::get_me,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::post_types::list_post_types, handlers::post_types::get_post_type,
        handlers::post_types::create_post_type, handlers::post_types::update_post_type,
        handlers::post_types::delete_post_type,
        handlers::posts::list_posts, handlers::posts::get_post, handlers::posts::get_main_posts,
        handlers::posts::create_post, handlers::posts::update_post, handlers::posts::delete_post,
        handlers::posts::upload_image, handlers::posts::get_image,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::Category, models::CategoryDetail,
            models::PostType, models::Post, models::PostCategoryEntry, models::PostDetail,
            models::RegisterRequest, models::LoginRequest, models::CategoryRequest,
            models::PostTypeRequest, models::CategoryInput, models::CreatePostRequest,
            models::UpdatePostRequest, models::LoginResponse, models::RefreshResponse,
            models::CreatedId, models::RegisteredUser, models::MessageResponse,
            models::ImageUploadResponse, models::HealthResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "users", description = "Registration and sessions"),
        (name = "categories", description = "Category management"),
        (name = "post-types", description = "Post type management"),
        (name = "posts", description = "Posts and images"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the guarded paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// Implements the **Unified State Pattern**: one cloneable container holding every
/// service built in `main`. Handlers take `State<AppState>`; extractors pull single
/// members through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres access behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Storage Layer: uploaded images.
    pub storage: StorageState,
    /// Cache Layer: Redis, liveness probe only.
    pub cache: CacheState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Token issuing and verification, derived from `config`.
    pub tokens: TokenService,
    /// Entity rules, sharing `repo` and `tokens`.
    pub blog: BlogService,
}

impl AppState {
    pub fn new(
        repo: RepositoryState,
        storage: StorageState,
        cache: CacheState,
        config: AppConfig,
    ) -> Self {
        let tokens = TokenService::new(&config);
        let blog = BlogService::new(repo.clone(), tokens.clone(), config.main_posts_per_category);
        Self {
            repo,
            storage,
            cache,
            config,
            tokens,
            blog,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for CacheState {
    fn from_ref(app_state: &AppState) -> CacheState {
        app_state.cache.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` is the whole check: a missing
/// credential rejects with 401 and an invalid one with 403 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Guards `admin_routes` with the role gate (`AdminUser`): 401/403 from
/// authentication, 404 when the user row is gone, 403 for non-admins.
async fn admin_middleware(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok());

    match origin {
        // Credentials (the refresh cookie) are only allowed for an explicit origin.
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any),
    }
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly, mounted under /api.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_middleware)),
        );

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span so every log line of a request carries its
/// `x-request-id` alongside the method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
