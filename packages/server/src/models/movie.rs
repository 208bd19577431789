use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::movie;
use crate::error::AppError;
use crate::models::shared::{ListMeta, validate_rating, validate_title};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddMovieRequest {
    pub title: String,
    /// TMDB identifier. Adding the same id again updates the existing row.
    #[schema(example = "603")]
    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    /// 0-10.
    pub rating: Option<i32>,
    pub watch_date: Option<String>,
    pub genres: Option<Vec<String>>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<i32>,
    pub watch_date: Option<String>,
    pub genres: Option<Vec<String>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<i32>,
    pub watch_date: Option<String>,
    pub genres: Vec<String>,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MovieDetailResponse {
    #[serde(flatten)]
    pub movie: MovieResponse,
    pub is_favorite: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MovieListResponse {
    pub data: Vec<MovieResponse>,
    pub meta: ListMeta,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ToggleFavoriteResponse {
    pub is_favorite: bool,
}

impl From<movie::Model> for MovieResponse {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            tmdb_id: m.tmdb_id,
            poster_path: m.poster_path,
            release_date: m.release_date,
            overview: m.overview,
            rating: m.rating,
            watch_date: m.watch_date,
            genres: split_genres(m.genres.as_deref()),
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Genres travel as a list but are stored comma-joined in one text column.
pub fn join_genres(genres: Option<&[String]>) -> Option<String> {
    genres.map(|g| {
        g.iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    })
}

pub fn split_genres(stored: Option<&str>) -> Vec<String> {
    stored
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn validate_add_movie(req: &AddMovieRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    if req.tmdb_id.trim().is_empty() {
        return Err(AppError::Validation("tmdb_id must not be empty".into()));
    }
    validate_rating(req.rating, 0, 10)
}

pub fn validate_update_movie(req: &UpdateMovieRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    validate_rating(req.rating, 0, 10)
}
