use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Daily per-endpoint request aggregates. One row per (endpoint, method, date).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_analytics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized path (`/api/v1/movies/:id`).
    pub endpoint: String,
    pub method: String,
    pub total_requests: i32,
    pub avg_response_time: i32,
    pub min_response_time: Option<i32>,
    pub max_response_time: Option<i32>,
    /// Requests with status < 400.
    pub success_count: i32,
    pub error_count: i32,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl ActiveModelBehavior for ActiveModel {}
