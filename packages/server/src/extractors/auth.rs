use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenKind, VerifyError};

/// Cookie carrying the short-lived access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Routes an unverified account may still reach.
const VERIFICATION_ALLOWLIST: &[&str] = &["/verify-email", "/resend-verification"];

/// Authenticated user resolved from the `accessToken` cookie (or an
/// `Authorization: Bearer <token>` header for non-browser clients).
///
/// Add this as a handler parameter to require authentication. The full user
/// row is loaded so handlers can check ownership without another query.
pub struct AuthUser {
    pub user: user::Model,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    /// Returns `Ok(())` if the user holds the admin role, `Err(PermissionDenied)` otherwise.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.user.role == user::ADMIN_ROLE {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Pull the raw access token out of a request: cookie first, bearer fallback.
pub fn access_token_from_parts(headers: &axum::http::HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token_from_parts(&parts.headers).ok_or(AppError::TokenMissing)?;

        let claims = jwt::verify(&token, &state.config.auth.jwt_secret, TokenKind::Access)
            .map_err(|e| match e {
                VerifyError::Expired => AppError::TokenExpired,
                VerifyError::Invalid => AppError::TokenInvalid,
            })?;

        let user = user::Entity::find_by_id(claims.uid)
            .one(&state.db)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        let path = parts.uri.path();
        let on_allowlist = VERIFICATION_ALLOWLIST.iter().any(|r| path.ends_with(r));
        if !user.is_email_verified && !on_allowlist {
            return Err(AppError::EmailNotVerified);
        }

        Ok(AuthUser { user })
    }
}
