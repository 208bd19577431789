use axum::Json;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;

use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Double-submit cookie mirroring the issued token.
pub const CSRF_TOKEN_COOKIE: &str = "csrfToken";
/// Header a browser client must echo the token in on mutating requests.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";
/// Clients tagging themselves `mobile` skip CSRF checks; they authenticate
/// with bearer headers rather than ambient cookies.
pub const API_CLIENT_HEADER: &str = "x-api-client";

/// Mint a signed token: `{nonce_hex}.{hmac_hex}`.
pub fn issue_token(secret: &str) -> String {
    let nonce: [u8; 32] = rand::rng().random();
    let nonce = hex::encode(nonce);
    let signature = mac_hex(secret, &nonce);
    format!("{nonce}.{signature}")
}

/// Check a token's signature without any server-side storage.
pub fn token_is_valid(token: &str, secret: &str) -> bool {
    let Some((nonce, signature)) = token.split_once('.') else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key length");
    mac.update(nonce.as_bytes());
    mac.verify_slice(&signature_bytes).is_ok()
}

fn mac_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// `GET /api/v1/csrf-token` — issue a token and mirror it in a cookie.
pub async fn issue_csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    let token = issue_token(&state.config.auth.jwt_secret);

    let mut cookie = Cookie::new(CSRF_TOKEN_COOKIE, token.clone());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_secure(state.config.server.is_production());
    cookie.set_path("/");

    (jar.add(cookie), Json(CsrfTokenResponse { csrf_token: token }))
}

/// Reject mutating `/api` requests whose `x-csrf-token` header doesn't match
/// the signed cookie. Requests tagged `x-api-client: mobile` are exempt.
pub async fn require_csrf_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method();
    let mutating = method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE;
    if !mutating || !req.uri().path().starts_with("/api") {
        return next.run(req).await;
    }

    let is_mobile_client = req
        .headers()
        .get(API_CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("mobile"));
    if is_mobile_client {
        return next.run(req).await;
    }

    let jar = CookieJar::from_headers(req.headers());
    let cookie_token = jar.get(CSRF_TOKEN_COOKIE).map(|c| c.value().to_string());
    let header_token = req
        .headers()
        .get(CSRF_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let valid = match (cookie_token, header_token) {
        (Some(cookie), Some(header)) => {
            cookie == header && token_is_valid(&header, &state.config.auth.jwt_secret)
        }
        _ => false,
    };

    if valid {
        next.run(req).await
    } else {
        AppError::CsrfMismatch.into_response()
    }
}
