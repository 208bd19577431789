use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::favorite;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddFavoriteRequest {
    pub movie_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FavoriteResponse {
    pub id: i32,
    pub user_id: i32,
    pub movie_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FavoriteStatusResponse {
    pub is_favorite: bool,
}

impl From<favorite::Model> for FavoriteResponse {
    fn from(m: favorite::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            movie_id: m.movie_id,
            created_at: m.created_at,
        }
    }
}
