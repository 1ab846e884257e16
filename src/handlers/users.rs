use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{
        LoginRequest, LoginResponse, MessageResponse, RefreshResponse, RegisterRequest,
        RegisteredUser, UserProfile,
    },
};

/// register_user
///
/// [Public Route] Creates an account with role `USER`.
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisteredUser),
        (status = 400, description = "Invalid email or password format"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let id = state.blog.register(&payload).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser { id })))
}

/// login_user
///
/// [Public Route] Returns both tokens in the body and also sets the refresh token
/// as an HTTP-only cookie.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid email format"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let response = state.blog.login(&payload).await?;
    let jar = state
        .tokens
        .attach_refresh_cookie(jar, response.refresh_token.clone());
    Ok((jar, Json(response)))
}

/// refresh_token
///
/// [Cookie Route] Exchanges the refresh cookie for a new access token. The refresh
/// token is rotated: the cookie is replaced and the previous token stops working.
#[utoipa::path(
    post,
    path = "/api/users/refresh_token",
    tag = "users",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "No refresh cookie"),
        (status = 403, description = "Invalid or rotated refresh token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let presented = state.tokens.refresh_cookie(&jar);
    let rotated = state.blog.refresh(presented.as_deref()).await?;
    let jar = state.tokens.attach_refresh_cookie(jar, rotated.refresh_token);
    Ok((
        jar,
        Json(RefreshResponse {
            token: rotated.access_token,
        }),
    ))
}

/// logout_user
///
/// [Public Route] Clears the cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "users",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    let presented = state.tokens.refresh_cookie(&jar);
    state.blog.logout(presented.as_deref()).await?;
    let jar = state.tokens.clear_refresh_cookie(jar);
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// get_me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.blog.profile(id).await?))
}
