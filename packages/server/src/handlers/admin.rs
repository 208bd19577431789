use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{movie, movie_review, post, request_log, user, watchlist};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::analytics::{
    DashboardResponse, RequestLogListResponse, RequestLogQuery, RequestLogResponse,
};
use crate::models::shared::{DEFAULT_LIMIT, ListMeta, MAX_LIMIT};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Admin",
    operation_id = "adminDashboard",
    summary = "Entity counts and today's traffic (admin)",
    responses(
        (status = 200, description = "Dashboard numbers", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id()))]
pub async fn dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    auth_user.require_admin()?;

    let users = user::Entity::find().count(&state.db).await?;
    let movies = movie::Entity::find().count(&state.db).await?;
    let watchlists = watchlist::Entity::find().count(&state.db).await?;
    let reviews = movie_review::Entity::find().count(&state.db).await?;
    let posts = post::Entity::find().count(&state.db).await?;

    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists")
        .and_utc();
    let requests_today = request_log::Entity::find()
        .filter(request_log::Column::Timestamp.gte(midnight))
        .count(&state.db)
        .await?;

    Ok(Json(DashboardResponse {
        users,
        movies,
        watchlists,
        reviews,
        posts,
        requests_today,
    }))
}

#[utoipa::path(
    get,
    path = "/request-logs",
    tag = "Admin",
    operation_id = "adminRequestLogs",
    summary = "Raw request logs, newest first (admin)",
    params(RequestLogQuery),
    responses(
        (status = 200, description = "Page of request logs", body = RequestLogListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn request_logs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RequestLogQuery>,
) -> Result<Json<RequestLogListResponse>, AppError> {
    auth_user.require_admin()?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let total = request_log::Entity::find().count(&state.db).await?;
    let rows = request_log::Entity::find()
        .order_by_desc(request_log::Column::Timestamp)
        .offset(Some(offset))
        .limit(Some(limit))
        .all(&state.db)
        .await?;

    Ok(Json(RequestLogListResponse {
        data: rows.into_iter().map(RequestLogResponse::from).collect(),
        meta: ListMeta {
            total,
            limit,
            offset,
        },
    }))
}
