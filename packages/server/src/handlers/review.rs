use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::movie_review;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::movie::find_movie;
use crate::models::review::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/movies/{movie_id}",
    tag = "Reviews",
    operation_id = "createReview",
    summary = "Review a movie",
    description = "One review per user per movie.",
    params(("movie_id" = i32, Path, description = "Movie ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Movie already reviewed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), movie_id))]
pub async fn create_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<i32>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_review(&payload)?;
    find_movie(&state.db, movie_id).await?;

    let already = movie_review::Entity::find()
        .filter(movie_review::Column::UserId.eq(auth_user.id()))
        .filter(movie_review::Column::MovieId.eq(movie_id))
        .one(&state.db)
        .await?
        .is_some();
    if already {
        return Err(AppError::Conflict(
            "You have already reviewed this movie".into(),
        ));
    }

    let now = Utc::now();
    let created = movie_review::ActiveModel {
        content: Set(payload.content),
        rating: Set(payload.rating),
        is_public: Set(payload.is_public),
        user_id: Set(auth_user.id()),
        movie_id: Set(movie_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ReviewResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Reviews",
    operation_id = "listMyReviews",
    summary = "List the caller's reviews, newest first",
    responses(
        (status = 200, description = "All reviews by the caller", body = Vec<ReviewResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id()))]
pub async fn list_my_reviews(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let rows = movie_review::Entity::find()
        .filter(movie_review::Column::UserId.eq(auth_user.id()))
        .order_by_desc(movie_review::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/movies/{movie_id}",
    tag = "Reviews",
    operation_id = "listMovieReviews",
    summary = "List reviews of a movie",
    description = "Public reviews from everyone, plus the caller's own private one.",
    params(("movie_id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<ReviewResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), movie_id))]
pub async fn list_movie_reviews(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<i32>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    find_movie(&state.db, movie_id).await?;

    let rows = movie_review::Entity::find()
        .filter(movie_review::Column::MovieId.eq(movie_id))
        .filter(
            Condition::any()
                .add(movie_review::Column::IsPublic.eq(true))
                .add(movie_review::Column::UserId.eq(auth_user.id())),
        )
        .order_by_desc(movie_review::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Reviews",
    operation_id = "getReview",
    summary = "Get a review",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review details", body = ReviewResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private review of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Review not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn get_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ReviewResponse>, AppError> {
    let found = find_review(&state.db, id).await?;

    if !found.is_public && found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    Ok(Json(found.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Reviews",
    operation_id = "updateReview",
    summary = "Update one of the caller's reviews",
    params(("id" = i32, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Review not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn update_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    validate_update_review(&payload)?;

    let found = find_review(&state.db, id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    let mut active: movie_review::ActiveModel = found.into();
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(Some(rating));
    }
    if let Some(is_public) = payload.is_public {
        active.is_public = Set(is_public);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Reviews",
    operation_id = "deleteReview",
    summary = "Delete one of the caller's reviews",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Review not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn delete_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let found = find_review(&state.db, id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    movie_review::Entity::delete_by_id(id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_review<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<movie_review::Model, AppError> {
    movie_review::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".into()))
}
