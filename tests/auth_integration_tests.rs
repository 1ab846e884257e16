mod common;

use axum::{
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
};
use blog_api::{
    AppError, AppState,
    auth::{AdminUser, AuthUser},
    models::{Role, User},
};
use common::{InMemoryRepository, test_state};
use std::sync::Arc;
use uuid::Uuid;

// --- Helper Functions ---

fn parts_with(headers: &[(header::HeaderName, String)]) -> Parts {
    let mut builder = Request::builder().uri("/api/posts");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

fn refresh_cookie(state: &AppState, token: &str) -> (header::HeaderName, String) {
    (
        header::COOKIE,
        format!("{}={}", state.tokens.cookie_name(), token),
    )
}

fn setup() -> (Arc<InMemoryRepository>, AppState, User, User) {
    let repo = Arc::new(InMemoryRepository::new());
    let reader = repo.seed_user("reader@example.com", Role::User);
    let admin = repo.seed_user("admin@example.com", Role::Admin);
    let state = test_state(repo.clone());
    (repo, state, reader, admin)
}

fn status_of(err: AppError) -> StatusCode {
    err.status()
}

// --- AuthUser ---

#[tokio::test]
async fn test_auth_user_from_bearer_token() {
    let (_, state, reader, _) = setup();
    let token = state.tokens.issue_access_token(&reader).unwrap();

    let mut parts = parts_with(&[bearer(&token)]);
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth.id, reader.id);
    let claims = auth.claims.expect("bearer path attaches the decoded identity");
    assert_eq!(claims.username, reader.username);
    assert_eq!(claims.role, Role::User);
}

#[tokio::test]
async fn test_auth_user_from_refresh_cookie() {
    let (_, state, reader, _) = setup();
    let token = state.tokens.issue_refresh_token(reader.id).unwrap();

    let mut parts = parts_with(&[refresh_cookie(&state, &token)]);
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth.id, reader.id);
    assert!(auth.claims.is_none(), "cookie path attaches the user id only");
}

#[tokio::test]
async fn test_bearer_wins_over_cookie() {
    let (_, state, reader, admin) = setup();
    let access = state.tokens.issue_access_token(&admin).unwrap();
    let refresh = state.tokens.issue_refresh_token(reader.id).unwrap();

    let mut parts = parts_with(&[bearer(&access), refresh_cookie(&state, &refresh)]);
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth.id, admin.id);
}

#[tokio::test]
async fn test_missing_credentials_is_unauthorized() {
    let (_, state, _, _) = setup();
    let mut parts = parts_with(&[]);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bearer_is_forbidden() {
    let (_, state, _, _) = setup();
    let mut parts = parts_with(&[bearer("definitely-not-a-jwt")]);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_token_in_bearer_slot_is_forbidden() {
    let (_, state, reader, _) = setup();
    let refresh = state.tokens.issue_refresh_token(reader.id).unwrap();
    let mut parts = parts_with(&[bearer(&refresh)]);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_access_token_in_cookie_slot_is_forbidden() {
    let (_, state, reader, _) = setup();
    let access = state.tokens.issue_access_token(&reader).unwrap();
    let mut parts = parts_with(&[refresh_cookie(&state, &access)]);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auth_user_does_not_require_user_row() {
    let (_, state, _, _) = setup();
    // Token for a user the repository has never seen: still authenticated.
    let ghost = Uuid::new_v4();
    let token = state.tokens.issue_refresh_token(ghost).unwrap();
    let mut parts = parts_with(&[refresh_cookie(&state, &token)]);

    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth.id, ghost);
}

// --- AdminUser (role gate) ---

#[tokio::test]
async fn test_admin_gate_accepts_admin() {
    let (_, state, _, admin) = setup();
    let token = state.tokens.issue_access_token(&admin).unwrap();
    let mut parts = parts_with(&[bearer(&token)]);

    let AdminUser(user) = AdminUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, admin.id);
}

#[tokio::test]
async fn test_admin_gate_rejects_regular_user() {
    let (_, state, reader, _) = setup();
    let token = state.tokens.issue_access_token(&reader).unwrap();
    let mut parts = parts_with(&[bearer(&token)]);

    let err = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_gate_missing_user_is_not_found() {
    let (_, state, _, _) = setup();
    let token = state.tokens.issue_refresh_token(Uuid::new_v4()).unwrap();
    let mut parts = parts_with(&[refresh_cookie(&state, &token)]);

    let err = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_gate_without_token_is_unauthorized() {
    let (_, state, _, _) = setup();
    let mut parts = parts_with(&[]);

    let err = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
}
