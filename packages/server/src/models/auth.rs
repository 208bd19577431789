use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;
use crate::models::shared::is_valid_email;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Display name (1-100 characters).
    #[schema(example = "Alice Wonder")]
    pub name: String,
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Unique email address, verified before first login.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

/// Collects all field failures into one aggregated message.
pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let mut problems: Vec<String> = Vec::new();

    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        problems.push("Name must be 1-100 characters".into());
    }

    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        problems.push("Username must be 1-32 characters".into());
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        problems.push("Username must contain only letters, digits, and underscores".into());
    }

    if !is_valid_email(payload.email.trim()) {
        problems.push("Email address is not valid".into());
    }

    if payload.password.len() < 8 || payload.password.len() > 128 {
        problems.push("Password must be 8-128 characters".into());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[schema(example = "alice_wonder")]
    pub identifier: String,
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.identifier.trim().is_empty() {
        return Err(AppError::Validation("Identifier must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct VerifyEmailQuery {
    /// Token from the verification email.
    pub token: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    /// The 6-digit code from the reset email.
    #[schema(example = "493027")]
    pub code: String,
    pub new_password: String,
}

pub fn validate_reset_password_request(payload: &ResetPasswordRequest) -> Result<(), AppError> {
    if payload.code.len() != 6 || !payload.code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("Reset code must be 6 digits".into()));
    }
    if payload.new_password.len() < 8 || payload.new_password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateEmailRequest {
    pub email: String,
}

/// Public view of a user; the password hash never leaves the database layer.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    pub name: String,
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub avatar: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            username: m.username,
            email: m.email,
            avatar: m.avatar,
            role: m.role,
            is_email_verified: m.is_email_verified,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Generic acknowledgement body for flows without a resource to return.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Password has been reset")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    /// Public path of the stored avatar under /uploads.
    #[schema(example = "/uploads/avatars/42-1f0c.png")]
    pub avatar: String,
}
