use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{movie, watchlist, watchlist_movie};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::movie::find_movie;
use crate::models::movie::MovieResponse;
use crate::models::shared::{ListMeta, ListQuery, like_pattern};
use crate::models::watchlist::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Watchlists",
    operation_id = "createWatchlist",
    summary = "Create a watchlist",
    request_body = CreateWatchlistRequest,
    responses(
        (status = 201, description = "Watchlist created", body = WatchlistResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Name already used by this user (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), name = %payload.name))]
pub async fn create_watchlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateWatchlistRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_watchlist(&payload)?;

    let name = payload.name.trim().to_string();
    ensure_name_is_free(&state.db, auth_user.id(), &name, None).await?;

    let now = Utc::now();
    let created = watchlist::ActiveModel {
        name: Set(name),
        description: Set(payload.description),
        is_public: Set(payload.is_public),
        user_id: Set(auth_user.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(WatchlistResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Watchlists",
    operation_id = "listWatchlists",
    summary = "List the caller's watchlists",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of watchlists", body = WatchlistListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn list_watchlists(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<WatchlistListResponse>, AppError> {
    let select = watchlist::Entity::find().filter(watchlist::Column::UserId.eq(auth_user.id()));
    list_watchlists_page(&state.db, select, &query).await
}

#[utoipa::path(
    get,
    path = "/public",
    tag = "Watchlists",
    operation_id = "listPublicWatchlists",
    summary = "List public watchlists from all users",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of public watchlists", body = WatchlistListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_public_watchlists(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<WatchlistListResponse>, AppError> {
    let select = watchlist::Entity::find().filter(watchlist::Column::IsPublic.eq(true));
    list_watchlists_page(&state.db, select, &query).await
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Watchlists",
    operation_id = "getWatchlist",
    summary = "Get a watchlist with its movies",
    description = "Accessible to the owner, or to any authenticated user when the list is public.",
    params(("id" = i32, Path, description = "Watchlist ID")),
    responses(
        (status = 200, description = "Watchlist details", body = WatchlistDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private list of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn get_watchlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<WatchlistDetailResponse>, AppError> {
    let found = find_visible_watchlist(&state.db, id, auth_user.id()).await?;

    let movies = movies_in_watchlist(&state.db, id).await?;

    Ok(Json(WatchlistDetailResponse {
        watchlist: WatchlistResponse::from(found),
        movies,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Watchlists",
    operation_id = "updateWatchlist",
    summary = "Update a watchlist",
    params(("id" = i32, Path, description = "Watchlist ID")),
    request_body = UpdateWatchlistRequest,
    responses(
        (status = 200, description = "Watchlist updated", body = WatchlistResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already used by this user (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn update_watchlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateWatchlistRequest>,
) -> Result<Json<WatchlistResponse>, AppError> {
    validate_update_watchlist(&payload)?;

    let found = find_owned_watchlist(&state.db, id, auth_user.id()).await?;

    if let Some(ref name) = payload.name {
        let name = name.trim();
        if name != found.name {
            ensure_name_is_free(&state.db, auth_user.id(), name, Some(id)).await?;
        }
    }

    let mut active: watchlist::ActiveModel = found.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    match payload.description {
        Some(Some(desc)) => active.description = Set(Some(desc)),
        Some(None) => active.description = Set(None),
        None => {}
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
    tag = "Watchlists",
    operation_id = "deleteWatchlist",
    summary = "Delete a watchlist and its entries",
    params(("id" = i32, Path, description = "Watchlist ID")),
    responses(
        (status = 204, description = "Watchlist deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn delete_watchlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_owned_watchlist(&txn, id, auth_user.id()).await?;

    watchlist_movie::Entity::delete_many()
        .filter(watchlist_movie::Column::WatchlistId.eq(id))
        .exec(&txn)
        .await?;
    watchlist::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/movies",
    tag = "Watchlists",
    operation_id = "listWatchlistMovies",
    summary = "List the movies in a watchlist",
    params(("id" = i32, Path, description = "Watchlist ID"), ListQuery),
    responses(
        (status = 200, description = "Page of movies", body = WatchlistMoviesResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private list of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id(), id))]
pub async fn list_watchlist_movies(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> Result<Json<WatchlistMoviesResponse>, AppError> {
    find_visible_watchlist(&state.db, id, auth_user.id()).await?;

    let member_ids = watchlist_movie::Entity::find()
        .filter(watchlist_movie::Column::WatchlistId.eq(id))
        .select_only()
        .column(watchlist_movie::Column::MovieId)
        .into_tuple::<i32>()
        .all(&state.db)
        .await?;

    let mut select = movie::Entity::find().filter(movie::Column::Id.is_in(member_ids));
    if let Some(term) = query.search_term() {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(movie::Column::Title)))
                .like(LikeExpr::new(like_pattern(&term)).escape('\\')),
        );
    }

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by(movie::Column::CreatedAt, query.order())
        .offset(Some(query.offset()))
        .limit(Some(query.limit()))
        .all(&state.db)
        .await?;

    Ok(Json(WatchlistMoviesResponse {
        data: rows.into_iter().map(MovieResponse::from).collect(),
        meta: ListMeta {
            total,
            limit: query.limit(),
            offset: query.offset(),
        },
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/movies",
    tag = "Watchlists",
    operation_id = "addWatchlistMovie",
    summary = "Add a movie to a watchlist",
    params(("id" = i32, Path, description = "Watchlist ID")),
    request_body = AddWatchlistMovieRequest,
    responses(
        (status = 201, description = "Entry created", body = WatchlistEntryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist or movie not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Movie already in the watchlist (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn add_watchlist_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AddWatchlistMovieRequest>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_owned_watchlist(&txn, id, auth_user.id()).await?;
    find_movie(&txn, payload.movie_id).await?;

    let already_member = watchlist_movie::Entity::find()
        .filter(watchlist_movie::Column::WatchlistId.eq(id))
        .filter(watchlist_movie::Column::MovieId.eq(payload.movie_id))
        .one(&txn)
        .await?
        .is_some();
    if already_member {
        return Err(AppError::Conflict("Movie is already in the watchlist".into()));
    }

    let created = watchlist_movie::ActiveModel {
        watchlist_id: Set(id),
        movie_id: Set(payload.movie_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    touch_watchlist(&txn, id).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(WatchlistEntryResponse::from(created))))
}

#[utoipa::path(
    delete,
    path = "/{id}/movies/{movie_id}",
    tag = "Watchlists",
    operation_id = "removeWatchlistMovie",
    summary = "Remove a movie from a watchlist",
    params(
        ("id" = i32, Path, description = "Watchlist ID"),
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found or movie not a member (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id, movie_id))]
pub async fn remove_watchlist_movie(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, movie_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_owned_watchlist(&txn, id, auth_user.id()).await?;

    let entry = watchlist_movie::Entity::find()
        .filter(watchlist_movie::Column::WatchlistId.eq(id))
        .filter(watchlist_movie::Column::MovieId.eq(movie_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie is not in the watchlist".into()))?;

    watchlist_movie::Entity::delete_by_id(entry.id).exec(&txn).await?;
    touch_watchlist(&txn, id).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/entries",
    tag = "Watchlists",
    operation_id = "listWatchlistEntries",
    summary = "List the raw membership rows of a watchlist",
    params(("id" = i32, Path, description = "Watchlist ID")),
    responses(
        (status = 200, description = "Junction rows, oldest first", body = Vec<WatchlistEntryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private list of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Watchlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn list_watchlist_entries(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<WatchlistEntryResponse>>, AppError> {
    find_visible_watchlist(&state.db, id, auth_user.id()).await?;

    let rows = watchlist_movie::Entity::find()
        .filter(watchlist_movie::Column::WatchlistId.eq(id))
        .order_by_asc(watchlist_movie::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(WatchlistEntryResponse::from).collect()))
}

async fn list_watchlists_page(
    db: &DatabaseConnection,
    mut select: Select<watchlist::Entity>,
    query: &ListQuery,
) -> Result<Json<WatchlistListResponse>, AppError> {
    if let Some(term) = query.search_term() {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(watchlist::Column::Name)))
                .like(LikeExpr::new(like_pattern(&term)).escape('\\')),
        );
    }

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => watchlist::Column::CreatedAt,
        "updated_at" => watchlist::Column::UpdatedAt,
        "name" => watchlist::Column::Name,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, updated_at, name".into(),
            ));
        }
    };

    let total = select.clone().count(db).await?;
    let rows = select
        .order_by(sort_column, query.order())
        .offset(Some(query.offset()))
        .limit(Some(query.limit()))
        .all(db)
        .await?;

    Ok(Json(WatchlistListResponse {
        data: rows.into_iter().map(WatchlistResponse::from).collect(),
        meta: ListMeta {
            total,
            limit: query.limit(),
            offset: query.offset(),
        },
    }))
}

/// Movies of a watchlist in insertion order, for the detail view.
async fn movies_in_watchlist(
    db: &DatabaseConnection,
    watchlist_id: i32,
) -> Result<Vec<MovieResponse>, AppError> {
    let entries = watchlist_movie::Entity::find()
        .filter(watchlist_movie::Column::WatchlistId.eq(watchlist_id))
        .order_by_asc(watchlist_movie::Column::CreatedAt)
        .all(db)
        .await?;

    let ids: Vec<i32> = entries.iter().map(|e| e.movie_id).collect();
    let mut rows = movie::Entity::find()
        .filter(movie::Column::Id.is_in(ids.clone()))
        .all(db)
        .await?;

    // Preserve insertion order.
    rows.sort_by_key(|m| ids.iter().position(|&id| id == m.id));
    Ok(rows.into_iter().map(MovieResponse::from).collect())
}

/// Reject a name the user already gave another watchlist.
async fn ensure_name_is_free<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
    exclude_id: Option<i32>,
) -> Result<(), AppError> {
    let mut select = watchlist::Entity::find()
        .filter(watchlist::Column::UserId.eq(user_id))
        .filter(watchlist::Column::Name.eq(name));
    if let Some(id) = exclude_id {
        select = select.filter(watchlist::Column::Id.ne(id));
    }

    if select.one(db).await?.is_some() {
        return Err(AppError::Conflict(
            "A watchlist with this name already exists".into(),
        ));
    }
    Ok(())
}

async fn touch_watchlist(txn: &DatabaseTransaction, id: i32) -> Result<(), AppError> {
    watchlist::Entity::update_many()
        .filter(watchlist::Column::Id.eq(id))
        .col_expr(watchlist::Column::UpdatedAt, Expr::value(Utc::now()))
        .exec(txn)
        .await?;
    Ok(())
}

/// Find a watchlist the caller may view: their own, or any public one.
pub async fn find_visible_watchlist<C: ConnectionTrait>(
    db: &C,
    id: i32,
    user_id: i32,
) -> Result<watchlist::Model, AppError> {
    let found = watchlist::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Watchlist not found".into()))?;

    if found.user_id != user_id && !found.is_public {
        return Err(AppError::PermissionDenied);
    }
    Ok(found)
}

/// Find a watchlist the caller owns.
pub async fn find_owned_watchlist<C: ConnectionTrait>(
    db: &C,
    id: i32,
    user_id: i32,
) -> Result<watchlist::Model, AppError> {
    let found = watchlist::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Watchlist not found".into()))?;

    if found.user_id != user_id {
        return Err(AppError::PermissionDenied);
    }
    Ok(found)
}
