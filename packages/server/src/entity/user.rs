use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The role assigned to newly registered users.
pub const DEFAULT_ROLE: &str = "user";

/// Role required for the analytics and admin dashboards.
pub const ADMIN_ROLE: &str = "admin";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 hash, never the plain password.
    pub password: String,
    /// Public path under /uploads, set after an avatar upload.
    pub avatar: Option<String>,
    pub role: String,

    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTimeUtc>,
    /// Stored as `{user_id}.{timestamp_ms}.{hmac}`, see `utils::reset_code`.
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTimeUtc>,

    pub last_login_at: Option<DateTimeUtc>,
    pub last_login_ip: Option<String>,

    #[sea_orm(has_many)]
    pub movies: HasMany<super::movie::Entity>,

    #[sea_orm(has_many)]
    pub watchlists: HasMany<super::watchlist::Entity>,

    #[sea_orm(has_many)]
    pub favorites: HasMany<super::favorite::Entity>,

    #[sea_orm(has_many)]
    pub reviews: HasMany<super::movie_review::Entity>,

    #[sea_orm(has_many)]
    pub posts: HasMany<super::post::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
