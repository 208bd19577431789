use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{post, post_comment, post_like};
use crate::error::AppError;
use crate::models::shared::{ListMeta, validate_title};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePostRequest {
    #[schema(example = "603")]
    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub title: String,
    pub content: String,
    /// Defaults to public.
    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub title: String,
    pub content: String,
    pub likes_count: i32,
    pub comments_count: i32,
    pub is_public: bool,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feed entry: a public post plus whether the caller has liked it.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: PostResponse,
    pub liked_by_me: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedResponse {
    pub data: Vec<FeedItem>,
    pub meta: ListMeta,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PostListResponse {
    pub data: Vec<PostResponse>,
    pub meta: ListMeta,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LikeResponse {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub content: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<post::Model> for PostResponse {
    fn from(m: post::Model) -> Self {
        Self {
            id: m.id,
            tmdb_id: m.tmdb_id,
            poster_path: m.poster_path,
            title: m.title,
            content: m.content,
            likes_count: m.likes_count,
            comments_count: m.comments_count,
            is_public: m.is_public,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<post_like::Model> for LikeResponse {
    fn from(m: post_like::Model) -> Self {
        Self {
            id: m.id,
            post_id: m.post_id,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}

impl From<post_comment::Model> for CommentResponse {
    fn from(m: post_comment::Model) -> Self {
        Self {
            id: m.id,
            content: m.content,
            post_id: m.post_id,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_post(req: &CreatePostRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    if req.tmdb_id.trim().is_empty() {
        return Err(AppError::Validation("tmdb_id must not be empty".into()));
    }
    validate_post_content(&req.content)
}

pub fn validate_update_post(req: &UpdatePostRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref content) = req.content {
        validate_post_content(content)?;
    }
    Ok(())
}

pub fn validate_comment_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() || content.chars().count() > 2000 {
        return Err(AppError::Validation(
            "Comment must be 1-2000 characters".into(),
        ));
    }
    Ok(())
}

fn validate_post_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() || content.chars().count() > 10_000 {
        return Err(AppError::Validation(
            "Content must be 1-10000 characters".into(),
        ));
    }
    Ok(())
}
