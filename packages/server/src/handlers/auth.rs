use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{ACCESS_TOKEN_COOKIE, AuthUser, REFRESH_TOKEN_COOKIE};
use crate::extractors::client_ip::ClientIp;
use crate::extractors::json::AppJson;
use crate::mailer::OutgoingEmail;
use crate::models::auth::{
    AvatarResponse, LoginRequest, MessageResponse, RegisterRequest, RequestPasswordResetRequest,
    ResendVerificationRequest, ResetPasswordRequest, UpdateEmailRequest, UserResponse,
    VerifyEmailQuery, validate_login_request, validate_register_request,
    validate_reset_password_request,
};
use crate::models::shared::is_valid_email;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenKind, VerifyError};
use crate::utils::{hash, reset_code};

/// Verification links expire after 24 hours.
const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
/// Reset codes expire after 1 hour.
const RESET_CODE_TTL_MINUTES: i64 = 60;

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; verification email sent", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username or email taken (USERNAME_TAKEN, EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::UsernameTaken);
    }
    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let verification_token = generate_verification_token();
    let now = Utc::now();

    let new_user = user::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        username: Set(username),
        email: Set(email),
        password: Set(password_hash),
        avatar: Set(None),
        role: Set(user::DEFAULT_ROLE.to_string()),
        is_email_verified: Set(false),
        email_verification_token: Set(Some(verification_token.clone())),
        email_verification_expires: Set(Some(now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS))),
        last_login_ip: Set(Some(ip)),
        last_login_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        // Duplicate-signup race: the pre-checks passed but the unique index
        // caught the second insert.
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("email") {
                AppError::EmailTaken
            } else {
                AppError::UsernameTaken
            }
        }
        _ => AppError::from(e),
    })?;

    send_or_log(&state, OutgoingEmail::verification(&created, &verification_token)).await;
    send_or_log(&state, OutgoingEmail::welcome(&created)).await;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with username or email",
    description = "On success sets the accessToken (15 min) and refreshToken (7 days) HTTP-only cookies.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; cookies set", body = UserResponse),
        (status = 401, description = "Bad credentials (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Email not verified (EMAIL_NOT_VERIFIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_login_request(&payload)?;

    let identifier = payload.identifier.trim();
    let found = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(identifier))
                .add(user::Column::Email.eq(identifier.to_lowercase())),
        )
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &found.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    if !found.is_email_verified {
        return Err(AppError::EmailNotVerified);
    }

    if let Some(ref previous_ip) = found.last_login_ip
        && *previous_ip != ip
    {
        send_or_log(&state, OutgoingEmail::new_login_alert(&found, &ip)).await;
    }

    let mut active: user::ActiveModel = found.into();
    active.last_login_ip = Set(Some(ip));
    active.last_login_at = Set(Some(Utc::now()));
    let updated = active.update(&state.db).await?;

    let access = jwt::sign_access_token(updated.id, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;
    let refresh = jwt::sign_refresh_token(updated.id, &state.config.auth.jwt_refresh_secret)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let secure = state.config.server.is_production();
    let jar = jar
        .add(auth_cookie(
            ACCESS_TOKEN_COOKIE,
            access,
            time::Duration::minutes(jwt::ACCESS_TOKEN_TTL_MINUTES),
            secure,
        ))
        .add(auth_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh,
            time::Duration::days(jwt::REFRESH_TOKEN_TTL_DAYS),
            secure,
        ));

    Ok((jar, Json(UserResponse::from(updated))))
}

#[utoipa::path(
    post,
    path = "/refresh-token",
    tag = "Auth",
    operation_id = "refreshToken",
    summary = "Re-issue the access token from the refresh cookie",
    responses(
        (status = 200, description = "Fresh access cookie set", body = MessageResponse),
        (status = 401, description = "Missing/expired/invalid refresh token", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar))]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::TokenMissing)?;

    let claims = jwt::verify(&token, &state.config.auth.jwt_refresh_secret, TokenKind::Refresh)
        .map_err(|e| match e {
            VerifyError::Expired => AppError::TokenExpired,
            VerifyError::Invalid => AppError::TokenInvalid,
        })?;

    let found = user::Entity::find_by_id(claims.uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if !found.is_email_verified {
        return Err(AppError::EmailNotVerified);
    }

    let access = jwt::sign_access_token(found.id, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let jar = jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        access,
        time::Duration::minutes(jwt::ACCESS_TOKEN_TTL_MINUTES),
        state.config.server.is_production(),
    ));

    Ok((jar, Json(MessageResponse::new("Token refreshed"))))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Clear the auth cookies",
    responses((status = 200, description = "Cookies cleared", body = MessageResponse)),
)]
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build())
        .remove(Cookie::build((REFRESH_TOKEN_COOKIE, "")).path("/").build());

    (jar, Json(MessageResponse::new("Logged out")))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current authenticated user",
    responses(
        (status = 200, description = "Profile of the caller", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.id()))]
pub async fn me(auth_user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(auth_user.user))
}

#[utoipa::path(
    get,
    path = "/verify-email",
    tag = "Auth",
    operation_id = "verifyEmail",
    summary = "Verify an email address from a mailed token",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Unknown, used, or expired token", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let found = user::Entity::find()
        .filter(user::Column::EmailVerificationToken.eq(&query.token))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired verification token".into()))?;

    if found.is_email_verified {
        return Err(AppError::Validation("Email is already verified".into()));
    }
    if let Some(expires) = found.email_verification_expires
        && expires < Utc::now()
    {
        return Err(AppError::Validation(
            "Invalid or expired verification token".into(),
        ));
    }

    let mut active: user::ActiveModel = found.into();
    active.is_email_verified = Set(true);
    active.email_verification_token = Set(None);
    active.email_verification_expires = Set(None);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Email verified")))
}

#[utoipa::path(
    post,
    path = "/resend-verification",
    tag = "Auth",
    operation_id = "resendVerification",
    summary = "Re-send the verification email",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Sent if the address has an unverified account", body = MessageResponse),
        (status = 400, description = "Email already verified", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResendVerificationRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // Same generic response whether or not the account exists.
    let generic = MessageResponse::new("If that address has an account, a verification email was sent");

    let Some(found) = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&state.db)
        .await?
    else {
        return Ok(Json(generic));
    };

    if found.is_email_verified {
        return Err(AppError::Validation("Email is already verified".into()));
    }

    let token = generate_verification_token();
    let mut active: user::ActiveModel = found.clone().into();
    active.email_verification_token = Set(Some(token.clone()));
    active.email_verification_expires =
        Set(Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)));
    let updated = active.update(&state.db).await?;

    send_or_log(&state, OutgoingEmail::verification(&updated, &token)).await;

    Ok(Json(generic))
}

#[utoipa::path(
    post,
    path = "/request-password-reset",
    tag = "Auth",
    operation_id = "requestPasswordReset",
    summary = "Email a 6-digit password reset code",
    request_body = RequestPasswordResetRequest,
    responses(
        (status = 200, description = "Sent if the address has an account", body = MessageResponse),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RequestPasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let generic = MessageResponse::new("If that address has an account, a reset code was sent");

    let Some(found) = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&state.db)
        .await?
    else {
        return Ok(Json(generic));
    };

    let code = reset_code::generate_code();
    let now = Utc::now();
    let stored = reset_code::hash_code(found.id, &code, now, state.config.auth.reset_secret());

    let mut active: user::ActiveModel = found.clone().into();
    active.password_reset_token = Set(Some(stored));
    active.password_reset_expires = Set(Some(now + Duration::minutes(RESET_CODE_TTL_MINUTES)));
    active.updated_at = Set(now);
    let updated = active.update(&state.db).await?;

    send_or_log(&state, OutgoingEmail::password_reset(&updated, &code)).await;

    Ok(Json(generic))
}

#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "Auth",
    operation_id = "resetPassword",
    summary = "Reset the password with a mailed code",
    description = "Codes are single-use and expire after one hour.",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Missing, expired, or wrong code", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_reset_password_request(&payload)?;

    let found = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid reset code".into()))?;

    let stored = found
        .password_reset_token
        .clone()
        .ok_or_else(|| AppError::Validation("No reset code requested".into()))?;

    let now = Utc::now();
    if let Some(expires) = found.password_reset_expires
        && expires < now
    {
        return Err(AppError::Validation("Reset code has expired".into()));
    }

    if !reset_code::verify_code(&payload.code, &stored, state.config.auth.reset_secret(), now) {
        return Err(AppError::Validation("Invalid reset code".into()));
    }

    let password_hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = found.clone().into();
    active.password = Set(password_hash);
    active.password_reset_token = Set(None);
    active.password_reset_expires = Set(None);
    active.updated_at = Set(now);
    let updated = active.update(&state.db).await?;

    send_or_log(&state, OutgoingEmail::password_changed(&updated)).await;

    Ok(Json(MessageResponse::new("Password has been reset")))
}

#[utoipa::path(
    post,
    path = "/update-email",
    tag = "Auth",
    operation_id = "updateEmail",
    summary = "Change the account email",
    description = "The new address starts unverified and receives a fresh verification token.",
    request_body = UpdateEmailRequest,
    responses(
        (status = 200, description = "Email updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Email taken (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id()))]
pub async fn update_email(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateEmailRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let new_email = payload.email.trim().to_lowercase();
    if !is_valid_email(&new_email) {
        return Err(AppError::Validation("Email address is not valid".into()));
    }

    if user::Entity::find()
        .filter(user::Column::Email.eq(&new_email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let old_email = auth_user.user.email.clone();
    let token = generate_verification_token();

    let mut active: user::ActiveModel = auth_user.user.into();
    active.email = Set(new_email);
    active.is_email_verified = Set(false);
    active.email_verification_token = Set(Some(token.clone()));
    active.email_verification_expires =
        Set(Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    send_or_log(&state, OutgoingEmail::email_changed(&updated, &old_email, &updated.email)).await;
    send_or_log(&state, OutgoingEmail::verification(&updated, &token)).await;

    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/upload-avatar",
    tag = "Auth",
    operation_id = "uploadAvatar",
    summary = "Upload an avatar image",
    description = "Multipart field `avatar`; png, jpeg, or webp up to 5 MB. Served back under /uploads.",
    request_body(content_type = "multipart/form-data", description = "Image file in an `avatar` field"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Missing field or unsupported image type", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.id()))]
pub async fn upload_avatar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut file: Option<(Option<String>, Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("avatar") {
            let content_type = field.content_type().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
            file = Some((content_type, file_name, data.to_vec()));
            break;
        }
    }

    let (content_type, file_name, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'avatar' field".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let extension = avatar_extension(content_type.as_deref(), file_name.as_deref())
        .ok_or_else(|| AppError::Validation("Avatar must be a png, jpeg, or webp image".into()))?;

    let avatars_dir = state.config.uploads.dir.join("avatars");
    tokio::fs::create_dir_all(&avatars_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {e}")))?;

    let file_name = format!("{}-{}.{}", auth_user.id(), uuid::Uuid::new_v4(), extension);
    tokio::fs::write(avatars_dir.join(&file_name), &data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store avatar: {e}")))?;

    let public_path = format!("/uploads/avatars/{file_name}");
    let mut active: user::ActiveModel = auth_user.user.into();
    active.avatar = Set(Some(public_path.clone()));
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    Ok(Json(AvatarResponse {
        avatar: public_path,
    }))
}

/// Body limit layer for the avatar upload route (5MB).
pub fn avatar_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(5 * 1024 * 1024)
}

fn avatar_extension(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    let mime = match content_type {
        Some(ct) => ct.to_string(),
        // Fall back to guessing from the filename for clients that don't
        // label multipart parts.
        None => mime_guess::from_path(file_name?).first()?.to_string(),
    };

    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn generate_verification_token() -> String {
    hex::encode(rand::rng().random::<[u8; 32]>())
}

fn auth_cookie(
    name: &'static str,
    token: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build()
}

async fn send_or_log(state: &AppState, email: OutgoingEmail) {
    if let Err(e) = state.mailer.send(email).await {
        tracing::warn!("Failed to send email: {e}");
    }
}
