use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::{Role, User},
};

/// AccessClaims
///
/// Payload of the short-lived access token. It embeds the full identity so that
/// authenticated handlers never need a database round trip to know who is calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// RefreshClaims
///
/// Payload of the long-lived refresh token: the user id only. `jti` makes every
/// issued token unique, so rotation always changes the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// TokenService
///
/// Issues and verifies HS256 tokens. Access and refresh tokens are signed with two
/// distinct secrets; a token of one kind never verifies as the other.
#[derive(Clone)]
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    cookie_name: String,
    cookie_secure: bool,
    cookie_same_site: SameSite,
}

impl TokenService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl_secs: config.access_token_ttl_minutes * 60,
            refresh_ttl_secs: config.refresh_token_ttl_days * 24 * 60 * 60,
            cookie_name: config.refresh_cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            cookie_same_site: config.cookie_same_site,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };
        sign(&claims, &self.access_secret)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            iat: now,
            exp: now + self.refresh_ttl_secs,
            jti: Uuid::new_v4(),
        };
        sign(&claims, &self.refresh_secret)
    }

    pub fn verify_access(&self, token: &str) -> Option<AccessClaims> {
        verify_token(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Option<RefreshClaims> {
        verify_token(token, &self.refresh_secret)
    }

    /// Reads the raw refresh token from the request cookies, if any.
    pub fn refresh_cookie(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// attach_refresh_cookie
    ///
    /// HttpOnly, `Path=/`, `Max-Age` equal to the refresh TTL. `Secure` and `SameSite`
    /// come from configuration (defaults: on, `Strict`).
    pub fn attach_refresh_cookie(&self, jar: CookieJar, token: String) -> CookieJar {
        let cookie = Cookie::build((self.cookie_name.clone(), token))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(self.cookie_same_site)
            .path("/")
            .max_age(time::Duration::seconds(self.refresh_ttl_secs))
            .build();
        jar.add(cookie)
    }

    /// Emits a removal cookie when the request carried one.
    pub fn clear_refresh_cookie(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.cookie_name.clone()).path("/"))
    }
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Checks signature and expiry (no leeway) against `secret`. Every failure mode
/// collapses into `None`; callers decide which status that maps to.
pub fn verify_token<C: DeserializeOwned>(token: &str, secret: &str) -> Option<C> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;

    match decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("token expired"),
                ErrorKind::InvalidSignature => tracing::debug!("token signature mismatch"),
                other => tracing::debug!("token rejected: {:?}", other),
            }
            None
        }
    }
}
