use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, USER_AGENT};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::*;

use crate::entity::{endpoint_analytics, request_log, user_analytics};
use crate::extractors::auth::access_token_from_parts;
use crate::extractors::client_ip::client_ip;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenKind};

/// Collapse numeric path segments so `/api/v1/movies/42` and
/// `/api/v1/movies/7` aggregate under the same endpoint key.
pub fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Everything captured about one handled request.
pub struct RequestMetric {
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
    /// `YYYY-MM-DD` bucket for the daily aggregates.
    pub date: String,
}

/// Record request analytics for every route except the health check and the
/// analytics read endpoints themselves.
///
/// Recording happens in a spawned task after the response is produced, so a
/// slow or failing analytics write never delays or breaks the client's
/// response; failures are logged and dropped.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if path == "/health" || path.starts_with("/api/v1/analytics") {
        return next.run(req).await;
    }

    let started = Instant::now();
    let method = req.method().as_str().to_string();
    let query = req.uri().query().map(str::to_string);
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip_address = client_ip(req.headers(), req.extensions());

    // Decode the token directly instead of waiting for the auth extractor;
    // this middleware also covers unauthenticated routes.
    let user_id = access_token_from_parts(req.headers())
        .and_then(|token| jwt::verify(&token, &state.config.auth.jwt_secret, TokenKind::Access).ok())
        .map(|claims| claims.uid);

    let response = next.run(req).await;

    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i32>().ok());

    let metric = RequestMetric {
        user_id,
        endpoint: normalize_endpoint(&path),
        method,
        path,
        status_code: response.status().as_u16() as i32,
        response_time: started.elapsed().as_millis().min(i32::MAX as u128) as i32,
        user_agent,
        ip_address: Some(ip_address),
        content_length,
        query,
        date: Utc::now().format("%Y-%m-%d").to_string(),
    };

    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = record_request(&db, metric).await {
            tracing::warn!("Failed to record request analytics: {e}");
        }
    });

    response
}

fn running_average(current_avg: i32, current_count: i32, sample: i32) -> i32 {
    let total = current_count as i64 + 1;
    let sum = current_avg as i64 * current_count as i64 + sample as i64;
    ((sum as f64) / (total as f64)).round() as i32
}

/// Insert the request log row and fold the sample into the per-user and
/// per-endpoint daily aggregates.
///
/// The read-modify-write runs inside one transaction with `FOR UPDATE` row
/// locks, so concurrent requests to the same bucket serialize rather than
/// undercount. Two first-requests for a brand-new bucket can still race to
/// insert; the unique index rejects the loser and the failure is only logged.
pub async fn record_request(db: &DatabaseConnection, metric: RequestMetric) -> Result<(), DbErr> {
    let txn = db.begin().await?;
    let now = Utc::now();

    request_log::ActiveModel {
        user_id: Set(metric.user_id),
        method: Set(metric.method.clone()),
        path: Set(metric.path),
        endpoint: Set(metric.endpoint.clone()),
        status_code: Set(metric.status_code),
        response_time: Set(metric.response_time),
        user_agent: Set(metric.user_agent),
        ip_address: Set(metric.ip_address),
        content_length: Set(metric.content_length),
        query: Set(metric.query),
        timestamp: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(user_id) = metric.user_id {
        let existing = user_analytics::Entity::find()
            .filter(user_analytics::Column::UserId.eq(user_id))
            .filter(user_analytics::Column::Date.eq(metric.date.clone()))
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        match existing {
            Some(row) => {
                let total = row.total_requests + 1;
                let avg = running_average(row.avg_response_time, row.total_requests, metric.response_time);
                let mut active: user_analytics::ActiveModel = row.into();
                active.total_requests = Set(total);
                active.avg_response_time = Set(avg);
                active.last_activity = Set(now);
                active.update(&txn).await?;
            }
            None => {
                user_analytics::ActiveModel {
                    user_id: Set(Some(user_id)),
                    total_requests: Set(1),
                    avg_response_time: Set(metric.response_time),
                    last_activity: Set(now),
                    date: Set(metric.date.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    let is_success = (200..400).contains(&metric.status_code);
    let existing = endpoint_analytics::Entity::find()
        .filter(endpoint_analytics::Column::Endpoint.eq(metric.endpoint.clone()))
        .filter(endpoint_analytics::Column::Method.eq(metric.method.clone()))
        .filter(endpoint_analytics::Column::Date.eq(metric.date.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    match existing {
        Some(row) => {
            let total = row.total_requests + 1;
            let avg = running_average(row.avg_response_time, row.total_requests, metric.response_time);
            let min = row
                .min_response_time
                .map_or(metric.response_time, |m| Ord::min(m, metric.response_time));
            let max = row
                .max_response_time
                .map_or(metric.response_time, |m| Ord::max(m, metric.response_time));
            let success = row.success_count + i32::from(is_success);
            let error = row.error_count + i32::from(!is_success);

            let mut active: endpoint_analytics::ActiveModel = row.into();
            active.total_requests = Set(total);
            active.avg_response_time = Set(avg);
            active.min_response_time = Set(Some(min));
            active.max_response_time = Set(Some(max));
            active.success_count = Set(success);
            active.error_count = Set(error);
            active.update(&txn).await?;
        }
        None => {
            endpoint_analytics::ActiveModel {
                endpoint: Set(metric.endpoint),
                method: Set(metric.method),
                total_requests: Set(1),
                avg_response_time: Set(metric.response_time),
                min_response_time: Set(Some(metric.response_time)),
                max_response_time: Set(Some(metric.response_time)),
                success_count: Set(i32::from(is_success)),
                error_count: Set(i32::from(!is_success)),
                date: Set(metric.date),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    Ok(())
}
