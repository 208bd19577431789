use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movie")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// TMDB identifier; (user_id, tmdb_id) is the conflict key on add.
    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    /// 0-10 when present.
    pub rating: Option<i32>,
    pub watch_date: Option<String>,
    /// JSON-serialized list of genre names.
    pub genres: Option<String>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub favorites: HasMany<super::favorite::Entity>,

    #[sea_orm(has_many)]
    pub reviews: HasMany<super::movie_review::Entity>,

    #[sea_orm(has_many, via = "watchlist_movie")]
    pub watchlists: HasMany<super::watchlist::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
