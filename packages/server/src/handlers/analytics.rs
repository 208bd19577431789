use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{endpoint_analytics, request_log, user_analytics};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::analytics::{
    DateQuery, EndpointAnalyticsResponse, SystemAnalyticsResponse, UserAnalyticsResponse,
};
use crate::state::AppState;

fn resolve_date(query: &DateQuery) -> String {
    query
        .date
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string())
}

#[utoipa::path(
    get,
    path = "/endpoints",
    tag = "Analytics",
    operation_id = "endpointAnalytics",
    summary = "Daily per-endpoint aggregates (admin)",
    params(DateQuery),
    responses(
        (status = 200, description = "Aggregates for the requested day", body = Vec<EndpointAnalyticsResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn endpoint_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<EndpointAnalyticsResponse>>, AppError> {
    auth_user.require_admin()?;

    let rows = endpoint_analytics::Entity::find()
        .filter(endpoint_analytics::Column::Date.eq(resolve_date(&query)))
        .order_by_desc(endpoint_analytics::Column::TotalRequests)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(EndpointAnalyticsResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Analytics",
    operation_id = "userAnalytics",
    summary = "Daily per-user aggregates (admin)",
    params(DateQuery),
    responses(
        (status = 200, description = "Aggregates for the requested day", body = Vec<UserAnalyticsResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn user_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<UserAnalyticsResponse>>, AppError> {
    auth_user.require_admin()?;

    let rows = user_analytics::Entity::find()
        .filter(user_analytics::Column::Date.eq(resolve_date(&query)))
        .order_by_desc(user_analytics::Column::TotalRequests)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(UserAnalyticsResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/system",
    tag = "Analytics",
    operation_id = "systemAnalytics",
    summary = "All-time request totals (admin)",
    responses(
        (status = 200, description = "Request totals and error rate", body = SystemAnalyticsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id()))]
pub async fn system_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SystemAnalyticsResponse>, AppError> {
    auth_user.require_admin()?;

    let total_requests = request_log::Entity::find().count(&state.db).await?;
    let error_count = request_log::Entity::find()
        .filter(request_log::Column::StatusCode.gte(400))
        .count(&state.db)
        .await?;

    let avg_response_time: Option<f64> = request_log::Entity::find()
        .select_only()
        .column_as(
            Expr::cust("coalesce(avg(\"response_time\"), 0)::float8"),
            "avg_response_time",
        )
        .into_tuple::<f64>()
        .one(&state.db)
        .await?;

    let error_rate = if total_requests > 0 {
        error_count as f64 / total_requests as f64
    } else {
        0.0
    };

    Ok(Json(SystemAnalyticsResponse {
        total_requests,
        error_count,
        error_rate,
        avg_response_time: avg_response_time.unwrap_or(0.0),
    }))
}
