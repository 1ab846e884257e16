use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::User,
    repository::RepositoryState,
    tokens::{AccessClaims, TokenService},
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers receive it as an
/// explicit argument instead of reading state attached to the request.
///
/// `claims` is only present when the caller authenticated with a Bearer access token;
/// the refresh-cookie path yields the user id alone.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub claims: Option<AccessClaims>,
}

/// AuthUser Extractor Implementation
///
/// Lookup order:
/// 1. `Authorization: Bearer <token>`, verified with the access secret.
/// 2. The refresh-token cookie, verified with the refresh secret.
///
/// Rejection: `Unauthorized` (401) when neither credential is present, `Forbidden`
/// (403) when the one presented does not verify. This step never touches the
/// database, so a rotated refresh cookie is only caught by `/api/users/refresh_token`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);

        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return match tokens.verify_access(token) {
                Some(claims) => Ok(AuthUser {
                    id: claims.sub,
                    claims: Some(claims),
                }),
                None => Err(AppError::forbidden("Invalid token")),
            };
        }

        let jar = CookieJar::from_headers(&parts.headers);
        match tokens.refresh_cookie(&jar) {
            Some(token) => match tokens.verify_refresh(&token) {
                Some(claims) => Ok(AuthUser {
                    id: claims.sub,
                    claims: None,
                }),
                None => Err(AppError::forbidden("Invalid token")),
            },
            None => {
                tracing::debug!("request rejected: no credential");
                Err(AppError::unauthorized("No token provided"))
            }
        }
    }
}

/// AdminUser
///
/// Role gate. Runs `AuthUser` first, then loads the user record exactly once:
/// missing user is `NotFound` (404), any role other than `ADMIN` is `Forbidden` (403).
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let repo = RepositoryState::from_ref(state);

        let user = repo
            .find_user_by_id(auth.id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !user.is_admin() {
            tracing::debug!(user_id = %user.id, "admin route rejected: role {}", user.role);
            return Err(AppError::forbidden("Admin role required"));
        }

        Ok(AdminUser(user))
    }
}
