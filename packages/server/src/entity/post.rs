use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub tmdb_id: String,
    pub poster_path: Option<String>,
    pub title: String,
    pub content: String,

    /// Denormalized; kept in step with post_like rows transactionally.
    pub likes_count: i32,
    /// Denormalized; kept in step with post_comment rows transactionally.
    pub comments_count: i32,
    pub is_public: bool,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::post_like::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::post_comment::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
