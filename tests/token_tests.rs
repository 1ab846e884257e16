use axum::{http::header::SET_COOKIE, response::IntoResponse};
use axum_extra::extract::cookie::{CookieJar, SameSite};
use blog_api::{
    AppConfig, TokenService,
    models::User,
    tokens::{AccessClaims, RefreshClaims, verify_token},
};
use chrono::Utc;
use uuid::Uuid;

// --- Helper Functions ---

fn sample_user() -> User {
    User {
        id: Uuid::from_u128(7),
        username: "reader".to_string(),
        email: "reader@example.com".to_string(),
        password: "unused".to_string(),
        role: "USER".to_string(),
        refresh_token: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn set_cookie_header(jar: CookieJar) -> String {
    let response = jar.into_response();
    response
        .headers()
        .get(SET_COOKIE)
        .expect("jar should emit Set-Cookie")
        .to_str()
        .unwrap()
        .to_string()
}

// --- Tests ---

#[test]
fn test_access_token_verifies_with_matching_secret() {
    let config = AppConfig::default();
    let tokens = TokenService::new(&config);
    let user = sample_user();

    let token = tokens.issue_access_token(&user).unwrap();
    let claims: AccessClaims = verify_token(&token, &config.access_token_secret).unwrap();

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, "reader@example.com");
}

#[test]
fn test_access_token_rejected_with_other_secret() {
    let tokens = TokenService::new(&AppConfig::default());
    let token = tokens.issue_access_token(&sample_user()).unwrap();

    assert!(verify_token::<AccessClaims>(&token, "some-other-secret").is_none());
}

#[test]
fn test_expired_tokens_verify_to_none() {
    let config = AppConfig {
        access_token_ttl_minutes: -1,
        refresh_token_ttl_days: -1,
        ..AppConfig::default()
    };
    let tokens = TokenService::new(&config);
    let user = sample_user();

    let access = tokens.issue_access_token(&user).unwrap();
    let refresh = tokens.issue_refresh_token(user.id).unwrap();

    assert!(tokens.verify_access(&access).is_none());
    assert!(tokens.verify_refresh(&refresh).is_none());
}

#[test]
fn test_refresh_token_carries_only_user_id() {
    let config = AppConfig::default();
    let tokens = TokenService::new(&config);
    let id = Uuid::new_v4();

    let token = tokens.issue_refresh_token(id).unwrap();
    let claims: RefreshClaims = verify_token(&token, &config.refresh_token_secret).unwrap();

    assert_eq!(claims.sub, id);
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
}

#[test]
fn test_garbage_token_is_none() {
    let tokens = TokenService::new(&AppConfig::default());
    assert!(tokens.verify_access("not.a.jwt").is_none());
    assert!(tokens.verify_refresh("").is_none());
}

#[test]
fn test_refresh_cookie_attributes() {
    let tokens = TokenService::new(&AppConfig::default());
    let jar = tokens.attach_refresh_cookie(CookieJar::new(), "abc".to_string());
    let header = set_cookie_header(jar);

    assert!(header.starts_with("jwt=abc"));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Secure"));
    assert!(header.contains("SameSite=Strict"));
    assert!(header.contains("Path=/"));
    assert!(header.contains(&format!("Max-Age={}", 7 * 24 * 60 * 60)));
}

#[test]
fn test_refresh_cookie_follows_configuration() {
    let config = AppConfig {
        refresh_cookie_name: "jid".to_string(),
        cookie_secure: false,
        cookie_same_site: SameSite::Lax,
        ..AppConfig::default()
    };
    let tokens = TokenService::new(&config);
    let header = set_cookie_header(tokens.attach_refresh_cookie(CookieJar::new(), "xyz".into()));

    assert!(header.starts_with("jid=xyz"));
    assert!(!header.contains("Secure"));
    assert!(header.contains("SameSite=Lax"));
}

#[test]
fn test_refresh_cookie_is_read_back_from_jar() {
    let tokens = TokenService::new(&AppConfig::default());
    let jar = tokens.attach_refresh_cookie(CookieJar::new(), "stored".to_string());

    assert_eq!(tokens.refresh_cookie(&jar).as_deref(), Some("stored"));
    assert!(tokens.refresh_cookie(&CookieJar::new()).is_none());
}
