use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Daily per-user request aggregates. One row per (user_id, date).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_analytics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,

    pub total_requests: i32,
    /// Running average, recomputed on each write.
    pub avg_response_time: i32,
    pub last_activity: DateTimeUtc,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl ActiveModelBehavior for ActiveModel {}
