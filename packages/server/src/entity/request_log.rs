use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// NULL for unauthenticated requests.
    pub user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,

    pub method: String,
    /// Raw request path as received.
    pub path: String,
    /// Path with numeric segments collapsed to `:id`.
    pub endpoint: String,
    pub status_code: i32,
    /// Milliseconds spent producing the response.
    pub response_time: i32,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub content_length: Option<i32>,
    pub query: Option<String>,

    pub timestamp: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
