use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{post, post_comment, post_like};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::post::*;
use crate::models::shared::{ListMeta, ListQuery, like_pattern};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Posts",
    operation_id = "createPost",
    summary = "Publish a post about a movie",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), title = %payload.title))]
pub async fn create_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_post(&payload)?;

    let now = Utc::now();
    let created = post::ActiveModel {
        tmdb_id: Set(payload.tmdb_id.trim().to_string()),
        poster_path: Set(payload.poster_path),
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content),
        likes_count: Set(0),
        comments_count: Set(0),
        is_public: Set(payload.is_public),
        user_id: Set(auth_user.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/feed",
    tag = "Posts",
    operation_id = "getFeed",
    summary = "Public posts from all users, newest first",
    description = "Each entry carries whether the caller has liked it. Searches title; sortable by created_at (default, desc) or likes_count.",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of the feed", body = FeedResponse),
        (status = 400, description = "Unknown sort column (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn get_feed(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let mut select = post::Entity::find().filter(post::Column::IsPublic.eq(true));

    if let Some(term) = query.search_term() {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(post::Column::Title)))
                .like(LikeExpr::new(like_pattern(&term)).escape('\\')),
        );
    }

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => post::Column::CreatedAt,
        "likes_count" => post::Column::LikesCount,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, likes_count".into(),
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

    let post_ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
    let liked: HashSet<i32> = post_like::Entity::find()
        .filter(post_like::Column::UserId.eq(auth_user.id()))
        .filter(post_like::Column::PostId.is_in(post_ids))
        .select_only()
        .column(post_like::Column::PostId)
        .into_tuple::<i32>()
        .all(&state.db)
        .await?
        .into_iter()
        .collect();

    let data = rows
        .into_iter()
        .map(|p| {
            let liked_by_me = liked.contains(&p.id);
            FeedItem {
                post: PostResponse::from(p),
                liked_by_me,
            }
        })
        .collect();

    Ok(Json(FeedResponse {
        data,
        meta: ListMeta {
            total,
            limit: query.limit(),
            offset: query.offset(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Posts",
    operation_id = "listMyPosts",
    summary = "List the caller's posts",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of posts", body = PostListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.id()))]
pub async fn list_my_posts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let mut select = post::Entity::find().filter(post::Column::UserId.eq(auth_user.id()));

    if let Some(term) = query.search_term() {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(post::Column::Title)))
                .like(LikeExpr::new(like_pattern(&term)).escape('\\')),
        );
    }

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by(post::Column::CreatedAt, query.order())
        .offset(Some(query.offset()))
        .limit(Some(query.limit()))
        .all(&state.db)
        .await?;

    Ok(Json(PostListResponse {
        data: rows.into_iter().map(PostResponse::from).collect(),
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
    tag = "Posts",
    operation_id = "getPost",
    summary = "Get a post",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post details", body = PostResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private post of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn get_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PostResponse>, AppError> {
    let found = find_visible_post(&state.db, id, auth_user.id()).await?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Posts",
    operation_id = "updatePost",
    summary = "Update one of the caller's posts",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn update_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    validate_update_post(&payload)?;

    let found = find_post(&state.db, id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    let mut active: post::ActiveModel = found.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
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
    tag = "Posts",
    operation_id = "deletePost",
    summary = "Delete one of the caller's posts with its likes and comments",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn delete_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let found = find_post(&txn, id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    post_like::Entity::delete_many()
        .filter(post_like::Column::PostId.eq(id))
        .exec(&txn)
        .await?;
    post_comment::Entity::delete_many()
        .filter(post_comment::Column::PostId.eq(id))
        .exec(&txn)
        .await?;
    post::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Posts",
    operation_id = "likePost",
    summary = "Like a post",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Like recorded", body = LikeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already liked (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn like_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_post_for_update(&txn, id).await?;

    let already = post_like::Entity::find()
        .filter(post_like::Column::UserId.eq(auth_user.id()))
        .filter(post_like::Column::PostId.eq(id))
        .one(&txn)
        .await?
        .is_some();
    if already {
        return Err(AppError::Conflict("You have already liked this post".into()));
    }

    let created = post_like::ActiveModel {
        user_id: Set(auth_user.id()),
        post_id: Set(id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    bump_counter(&txn, id, post::Column::LikesCount, 1).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(LikeResponse::from(created))))
}

#[utoipa::path(
    delete,
    path = "/{id}/like",
    tag = "Posts",
    operation_id = "unlikePost",
    summary = "Remove the caller's like from a post",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Like removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Post not found or not liked (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn unlike_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_post_for_update(&txn, id).await?;

    let found = post_like::Entity::find()
        .filter(post_like::Column::UserId.eq(auth_user.id()))
        .filter(post_like::Column::PostId.eq(id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("You have not liked this post".into()))?;

    post_like::Entity::delete_by_id(found.id).exec(&txn).await?;
    bump_counter(&txn, id, post::Column::LikesCount, -1).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "Posts",
    operation_id = "listComments",
    summary = "List the comments on a post, oldest first",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private post of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), id))]
pub async fn list_comments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    find_visible_post(&state.db, id, auth_user.id()).await?;

    let rows = post_comment::Entity::find()
        .filter(post_comment::Column::PostId.eq(id))
        .order_by_asc(post_comment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(CommentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "Posts",
    operation_id = "addComment",
    summary = "Comment on a post",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_comment_content(&payload.content)?;

    let txn = state.db.begin().await?;
    find_post_for_update(&txn, id).await?;

    let now = Utc::now();
    let created = post_comment::ActiveModel {
        content: Set(payload.content),
        user_id: Set(auth_user.id()),
        post_id: Set(id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    bump_counter(&txn, id, post::Column::CommentsCount, 1).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/comments/{comment_id}",
    tag = "Posts",
    operation_id = "updateComment",
    summary = "Edit one of the caller's comments",
    params(("comment_id" = i32, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.id(), comment_id))]
pub async fn update_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
    AppJson(payload): AppJson<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    validate_comment_content(&payload.content)?;

    let found = find_comment(&state.db, comment_id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    let mut active: post_comment::ActiveModel = found.into();
    active.content = Set(payload.content);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/comments/{comment_id}",
    tag = "Posts",
    operation_id = "deleteComment",
    summary = "Delete one of the caller's comments",
    params(("comment_id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.id(), comment_id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let found = find_comment(&txn, comment_id).await?;
    if found.user_id != auth_user.id() {
        return Err(AppError::PermissionDenied);
    }

    post_comment::Entity::delete_by_id(found.id).exec(&txn).await?;
    bump_counter(&txn, found.post_id, post::Column::CommentsCount, -1).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adjust a denormalized counter column within the caller's transaction, so
/// the junction mutation and the counter move commit or roll back together.
async fn bump_counter(
    txn: &DatabaseTransaction,
    post_id: i32,
    column: post::Column,
    delta: i32,
) -> Result<(), AppError> {
    post::Entity::update_many()
        .filter(post::Column::Id.eq(post_id))
        .col_expr(column, Expr::col(column).add(delta))
        .exec(txn)
        .await?;
    Ok(())
}

async fn find_post<C: ConnectionTrait>(db: &C, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

/// Lock the post row while its likes/comments and counters change.
async fn find_post_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

/// A post the caller may view: public, or their own.
async fn find_visible_post<C: ConnectionTrait>(
    db: &C,
    id: i32,
    user_id: i32,
) -> Result<post::Model, AppError> {
    let found = find_post(db, id).await?;
    if !found.is_public && found.user_id != user_id {
        return Err(AppError::PermissionDenied);
    }
    Ok(found)
}
