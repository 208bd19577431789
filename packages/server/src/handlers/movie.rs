use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{favorite, movie, movie_review, watchlist_movie};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::movie::*;
use crate::models::shared::{ListMeta, ListQuery, like_pattern};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Movies",
    operation_id = "addMovie",
    summary = "Add a watched movie",
    description = "Adding a tmdb_id the user already logged updates that row instead of creating a duplicate.",
    request_body = AddMovieRequest,
    responses(
        (status = 201, description = "Movie created", body = MovieResponse),
        (status = 200, description = "Existing movie updated", body = MovieResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), tmdb_id = %payload.tmdb_id))]
pub async fn add_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddMovieRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_add_movie(&payload)?;

    let tmdb_id = payload.tmdb_id.trim().to_string();
    let now = Utc::now();

    let existing = movie::Entity::find()
        .filter(movie::Column::UserId.eq(auth_user.id()))
        .filter(movie::Column::TmdbId.eq(&tmdb_id))
        .one(&state.db)
        .await?;

    if let Some(found) = existing {
        let mut active: movie::ActiveModel = found.into();
        active.title = Set(payload.title.trim().to_string());
        active.poster_path = Set(payload.poster_path);
        active.release_date = Set(payload.release_date);
        active.overview = Set(payload.overview);
        active.rating = Set(payload.rating);
        active.watch_date = Set(payload.watch_date);
        active.genres = Set(join_genres(payload.genres.as_deref()));
        active.updated_at = Set(now);
        let updated = active.update(&state.db).await?;
        return Ok((StatusCode::OK, Json(MovieResponse::from(updated))));
    }

    let created = movie::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        tmdb_id: Set(tmdb_id),
        poster_path: Set(payload.poster_path),
        release_date: Set(payload.release_date),
        overview: Set(payload.overview),
        rating: Set(payload.rating),
        watch_date: Set(payload.watch_date),
        genres: Set(join_genres(payload.genres.as_deref())),
        user_id: Set(auth_user.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(MovieResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Movies",
    operation_id = "listMovies",
    summary = "List the caller's movies",
    description = "Searches title and overview; sortable by created_at (default, desc), title, rating, watch_date, or release_date.",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of movies", body = MovieListResponse),
        (status = 400, description = "Unknown sort column (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn list_movies(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MovieListResponse>, AppError> {
    let mut select = movie::Entity::find().filter(movie::Column::UserId.eq(auth_user.id()));

    if let Some(term) = query.search_term() {
        let pattern = LikeExpr::new(like_pattern(&term)).escape('\\');
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(movie::Column::Title)))
                        .like(pattern.clone()),
                )
                .add(Expr::expr(Func::lower(Expr::col(movie::Column::Overview))).like(pattern)),
        );
    }

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => movie::Column::CreatedAt,
        "title" => movie::Column::Title,
        "rating" => movie::Column::Rating,
        "watch_date" => movie::Column::WatchDate,
        "release_date" => movie::Column::ReleaseDate,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, title, rating, watch_date, release_date"
                    .into(),
            ));
        }
    };

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by(sort_column, query.order())
        .offset(Some(query.offset()))
        .limit(Some(query.limit()))
        .all(&state.db)
        .await?;

    Ok(Json(MovieListResponse {
        data: rows.into_iter().map(MovieResponse::from).collect(),
        meta: ListMeta {
            total,
            limit: query.limit(),
            offset: query.offset(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Movies",
    operation_id = "getMovie",
    summary = "Get one of the caller's movies",
    params(("id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Movie with favorite status", body = MovieDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn get_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MovieDetailResponse>, AppError> {
    let found = find_owned_movie(&state.db, id, auth_user.id()).await?;

    let is_favorite = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .filter(favorite::Column::MovieId.eq(id))
        .one(&state.db)
        .await?
        .is_some();

    Ok(Json(MovieDetailResponse {
        movie: MovieResponse::from(found),
        is_favorite,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Movies",
    operation_id = "updateMovie",
    summary = "Update one of the caller's movies",
    params(("id" = i32, Path, description = "Movie ID")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated", body = MovieResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn update_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateMovieRequest>,
) -> Result<Json<MovieResponse>, AppError> {
    validate_update_movie(&payload)?;

    let found = find_owned_movie(&state.db, id, auth_user.id()).await?;

    if payload == UpdateMovieRequest::default() {
        return Ok(Json(found.into()));
    }

    let mut active: movie::ActiveModel = found.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(poster_path) = payload.poster_path {
        active.poster_path = Set(Some(poster_path));
    }
    if let Some(release_date) = payload.release_date {
        active.release_date = Set(Some(release_date));
    }
    if let Some(overview) = payload.overview {
        active.overview = Set(Some(overview));
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(Some(rating));
    }
    if let Some(watch_date) = payload.watch_date {
        active.watch_date = Set(Some(watch_date));
    }
    if payload.genres.is_some() {
        active.genres = Set(join_genres(payload.genres.as_deref()));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Movies",
    operation_id = "deleteMovie",
    summary = "Delete one of the caller's movies",
    description = "Also removes the movie's favorites, watchlist entries, and reviews.",
    params(("id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 204, description = "Movie deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn delete_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_owned_movie(&txn, id, auth_user.id()).await?;

    favorite::Entity::delete_many()
        .filter(favorite::Column::MovieId.eq(id))
        .exec(&txn)
        .await?;
    watchlist_movie::Entity::delete_many()
        .filter(watchlist_movie::Column::MovieId.eq(id))
        .exec(&txn)
        .await?;
    movie_review::Entity::delete_many()
        .filter(movie_review::Column::MovieId.eq(id))
        .exec(&txn)
        .await?;
    movie::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/toggle-favorite",
    tag = "Movies",
    operation_id = "toggleFavorite",
    summary = "Flip the favorite flag on one of the caller's movies",
    params(("id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "New favorite status", body = ToggleFavoriteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn toggle_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ToggleFavoriteResponse>, AppError> {
    find_owned_movie(&state.db, id, auth_user.id()).await?;

    let existing = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .filter(favorite::Column::MovieId.eq(id))
        .one(&state.db)
        .await?;

    let is_favorite = match existing {
        Some(found) => {
            favorite::Entity::delete_by_id(found.id).exec(&state.db).await?;
            false
        }
        None => {
            favorite::ActiveModel {
                user_id: Set(auth_user.id()),
                movie_id: Set(id),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
            true
        }
    };

    Ok(Json(ToggleFavoriteResponse { is_favorite }))
}

/// Find a movie by ID, requiring the caller to own it.
///
/// Distinguishes 404 (no such movie) from 403 (someone else's movie).
pub async fn find_owned_movie<C: ConnectionTrait>(
    db: &C,
    id: i32,
    user_id: i32,
) -> Result<movie::Model, AppError> {
    let found = movie::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".into()))?;

    if found.user_id != user_id {
        return Err(AppError::PermissionDenied);
    }

    Ok(found)
}

/// Find a movie by ID without an ownership requirement.
pub async fn find_movie<C: ConnectionTrait>(db: &C, id: i32) -> Result<movie::Model, AppError> {
    movie::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".into()))
}
