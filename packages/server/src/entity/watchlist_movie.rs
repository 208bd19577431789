use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "watchlist_movie")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub watchlist_id: i32,
    #[sea_orm(belongs_to, from = "watchlist_id", to = "id")]
    pub watchlist: HasOne<super::watchlist::Entity>,

    pub movie_id: i32,
    #[sea_orm(belongs_to, from = "movie_id", to = "id")]
    pub movie: HasOne<super::movie::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
