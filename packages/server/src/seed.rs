use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{
    endpoint_analytics, favorite, movie, movie_review, post_like, user_analytics, watchlist_movie,
};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite unique indexes, so the
/// junction/aggregate uniqueness keys are created manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_movie_user_tmdb")
            .table(movie::Entity)
            .col(movie::Column::UserId)
            .col(movie::Column::TmdbId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_watchlist_movie_unique")
            .table(watchlist_movie::Entity)
            .col(watchlist_movie::Column::WatchlistId)
            .col(watchlist_movie::Column::MovieId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_favorite_user_movie")
            .table(favorite::Entity)
            .col(favorite::Column::UserId)
            .col(favorite::Column::MovieId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_review_user_movie")
            .table(movie_review::Entity)
            .col(movie_review::Column::UserId)
            .col(movie_review::Column::MovieId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_post_like_user_post")
            .table(post_like::Entity)
            .col(post_like::Column::UserId)
            .col(post_like::Column::PostId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_user_analytics_user_date")
            .table(user_analytics::Entity)
            .col(user_analytics::Column::UserId)
            .col(user_analytics::Column::Date)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_endpoint_analytics_key")
            .table(endpoint_analytics::Entity)
            .col(endpoint_analytics::Column::Endpoint)
            .col(endpoint_analytics::Column::Method)
            .col(endpoint_analytics::Column::Date)
            .to_string(PostgresQueryBuilder),
    ];

    let count = statements.len();
    for stmt in statements {
        db.execute_unprepared(&stmt).await?;
    }

    info!("Ensured {} composite unique indexes exist", count);
    Ok(())
}
