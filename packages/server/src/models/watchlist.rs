use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{watchlist, watchlist_movie};
use crate::error::AppError;
use crate::models::movie::MovieResponse;
use crate::models::shared::{ListMeta, double_option, validate_title};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateWatchlistRequest {
    #[schema(example = "Weekend")]
    pub name: String,
    pub description: Option<String>,
    /// Defaults to private.
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateWatchlistRequest {
    pub name: Option<String>,
    /// Omit to keep, null to clear, value to set.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_public: Option<bool>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddWatchlistMovieRequest {
    pub movie_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WatchlistResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WatchlistDetailResponse {
    #[serde(flatten)]
    pub watchlist: WatchlistResponse,
    pub movies: Vec<MovieResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WatchlistListResponse {
    pub data: Vec<WatchlistResponse>,
    pub meta: ListMeta,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WatchlistMoviesResponse {
    pub data: Vec<MovieResponse>,
    pub meta: ListMeta,
}

/// Raw junction row, exposed on the /entries sub-route.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WatchlistEntryResponse {
    pub id: i32,
    pub watchlist_id: i32,
    pub movie_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<watchlist::Model> for WatchlistResponse {
    fn from(m: watchlist::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            is_public: m.is_public,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<watchlist_movie::Model> for WatchlistEntryResponse {
    fn from(m: watchlist_movie::Model) -> Self {
        Self {
            id: m.id,
            watchlist_id: m.watchlist_id,
            movie_id: m.movie_id,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_watchlist(req: &CreateWatchlistRequest) -> Result<(), AppError> {
    validate_title(&req.name)?;
    validate_description(req.description.as_deref())
}

pub fn validate_update_watchlist(req: &UpdateWatchlistRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_title(name)?;
    }
    if let Some(Some(ref desc)) = req.description {
        validate_description(Some(desc))?;
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), AppError> {
    if let Some(desc) = description
        && desc.chars().count() > 1000
    {
        return Err(AppError::Validation(
            "Description must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}
