use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{endpoint_analytics, request_log, user_analytics};
use crate::models::shared::ListMeta;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DateQuery {
    /// `YYYY-MM-DD`; defaults to today.
    pub date: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RequestLogQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EndpointAnalyticsResponse {
    pub endpoint: String,
    pub method: String,
    pub total_requests: i32,
    pub avg_response_time: i32,
    pub min_response_time: Option<i32>,
    pub max_response_time: Option<i32>,
    pub success_count: i32,
    pub error_count: i32,
    pub date: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserAnalyticsResponse {
    pub user_id: Option<i32>,
    pub total_requests: i32,
    pub avg_response_time: i32,
    pub last_activity: DateTime<Utc>,
    pub date: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SystemAnalyticsResponse {
    pub total_requests: u64,
    pub error_count: u64,
    /// Fraction of requests with status >= 400.
    pub error_rate: f64,
    pub avg_response_time: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub users: u64,
    pub movies: u64,
    pub watchlists: u64,
    pub reviews: u64,
    pub posts: u64,
    pub requests_today: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RequestLogResponse {
    pub id: i32,
    pub user_id: Option<i32>,
    pub method: String,
    pub path: String,
    pub endpoint: String,
    pub status_code: i32,
    pub response_time: i32,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub content_length: Option<i32>,
    pub query: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RequestLogListResponse {
    pub data: Vec<RequestLogResponse>,
    pub meta: ListMeta,
}

impl From<endpoint_analytics::Model> for EndpointAnalyticsResponse {
    fn from(m: endpoint_analytics::Model) -> Self {
        Self {
            endpoint: m.endpoint,
            method: m.method,
            total_requests: m.total_requests,
            avg_response_time: m.avg_response_time,
            min_response_time: m.min_response_time,
            max_response_time: m.max_response_time,
            success_count: m.success_count,
            error_count: m.error_count,
            date: m.date,
        }
    }
}

impl From<user_analytics::Model> for UserAnalyticsResponse {
    fn from(m: user_analytics::Model) -> Self {
        Self {
            user_id: m.user_id,
            total_requests: m.total_requests,
            avg_response_time: m.avg_response_time,
            last_activity: m.last_activity,
            date: m.date,
        }
    }
}

impl From<request_log::Model> for RequestLogResponse {
    fn from(m: request_log::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            method: m.method,
            path: m.path,
            endpoint: m.endpoint,
            status_code: m.status_code,
            response_time: m.response_time,
            user_agent: m.user_agent,
            ip_address: m.ip_address,
            content_length: m.content_length,
            query: m.query,
            timestamp: m.timestamp,
        }
    }
}
