use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::movie_review;
use crate::error::AppError;
use crate::models::shared::validate_rating;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReviewRequest {
    pub content: String,
    /// 1-10.
    pub rating: Option<i32>,
    /// Defaults to public.
    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateReviewRequest {
    pub content: Option<String>,
    pub rating: Option<i32>,
    pub is_public: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub content: String,
    pub rating: Option<i32>,
    pub is_public: bool,
    pub user_id: i32,
    pub movie_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<movie_review::Model> for ReviewResponse {
    fn from(m: movie_review::Model) -> Self {
        Self {
            id: m.id,
            content: m.content,
            rating: m.rating,
            is_public: m.is_public,
            user_id: m.user_id,
            movie_id: m.movie_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_review(req: &CreateReviewRequest) -> Result<(), AppError> {
    validate_content(&req.content)?;
    validate_rating(req.rating, 1, 10)
}

pub fn validate_update_review(req: &UpdateReviewRequest) -> Result<(), AppError> {
    if let Some(ref content) = req.content {
        validate_content(content)?;
    }
    validate_rating(req.rating, 1, 10)
}

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() || content.chars().count() > 10_000 {
        return Err(AppError::Validation(
            "Content must be 1-10000 characters".into(),
        ));
    }
    Ok(())
}
