use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Access tokens ride the `accessToken` cookie and expire quickly.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
/// Refresh tokens ride the `refreshToken` cookie.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Distinguishes the two token families; signed into the claims so an
/// access secret leak can't mint refresh tokens and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i32,
    pub kind: TokenKind,
    pub exp: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    Expired,
    Invalid,
}

/// Sign a short-lived access token for a user.
pub fn sign_access_token(user_id: i32, secret: &str) -> Result<String> {
    sign(user_id, TokenKind::Access, Duration::minutes(ACCESS_TOKEN_TTL_MINUTES), secret)
}

/// Sign a long-lived refresh token for a user.
pub fn sign_refresh_token(user_id: i32, secret: &str) -> Result<String> {
    sign(user_id, TokenKind::Refresh, Duration::days(REFRESH_TOKEN_TTL_DAYS), secret)
}

fn sign(user_id: i32, kind: TokenKind, ttl: Duration, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        uid: user_id,
        kind,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token of the expected kind.
pub fn verify(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, VerifyError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::Expired,
        _ => VerifyError::Invalid,
    })?;

    if token_data.claims.kind != expected {
        return Err(VerifyError::Invalid);
    }

    Ok(token_data.claims)
}
