use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{favorite, movie};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::movie::find_movie;
use crate::models::favorite::*;
use crate::models::movie::{MovieListResponse, MovieResponse};
use crate::models::shared::{ListMeta, ListQuery, like_pattern};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Favorites",
    operation_id = "addFavorite",
    summary = "Bookmark a movie",
    request_body = AddFavoriteRequest,
    responses(
        (status = 201, description = "Favorite created", body = FavoriteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already in favorites (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id()))]
pub async fn add_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddFavoriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    find_movie(&state.db, payload.movie_id).await?;

    let already = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .filter(favorite::Column::MovieId.eq(payload.movie_id))
        .one(&state.db)
        .await?
        .is_some();
    if already {
        return Err(AppError::Conflict("Movie is already in favorites".into()));
    }

    let created = favorite::ActiveModel {
        user_id: Set(auth_user.id()),
        movie_id: Set(payload.movie_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(FavoriteResponse::from(created))))
}

#[utoipa::path(
    delete,
    path = "/{movie_id}",
    tag = "Favorites",
    operation_id = "removeFavorite",
    summary = "Remove a movie from favorites",
    params(("movie_id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Movie not found or not favorited (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), movie_id))]
pub async fn remove_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    find_movie(&state.db, movie_id).await?;

    let found = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .filter(favorite::Column::MovieId.eq(movie_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie is not in favorites".into()))?;

    favorite::Entity::delete_by_id(found.id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Favorites",
    operation_id = "listFavorites",
    summary = "List the caller's favorite movies",
    description = "Searches title and overview; sortable by created_at (default, desc), title, or rating.",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of favorite movies", body = MovieListResponse),
        (status = 400, description = "Unknown sort column (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn list_favorites(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MovieListResponse>, AppError> {
    let favorite_ids = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .select_only()
        .column(favorite::Column::MovieId)
        .into_tuple::<i32>()
        .all(&state.db)
        .await?;

    let mut select = movie::Entity::find().filter(movie::Column::Id.is_in(favorite_ids));

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
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, title, rating".into(),
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
    path = "/{movie_id}/status",
    tag = "Favorites",
    operation_id = "favoriteStatus",
    summary = "Check whether a movie is favorited",
    params(("movie_id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Favorite status", body = FavoriteStatusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Movie not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), movie_id))]
pub async fn favorite_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<i32>,
) -> Result<Json<FavoriteStatusResponse>, AppError> {
    find_movie(&state.db, movie_id).await?;

    let is_favorite = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(auth_user.id()))
        .filter(favorite::Column::MovieId.eq(movie_id))
        .one(&state.db)
        .await?
        .is_some();

    Ok(Json(FavoriteStatusResponse { is_favorite }))
}
