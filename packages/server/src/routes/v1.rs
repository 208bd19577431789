use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/movies", movie_routes())
        .nest("/watchlists", watchlist_routes())
        .nest("/favorites", favorite_routes())
        .nest("/reviews", review_routes())
        .nest("/posts", post_routes())
        .nest("/analytics", analytics_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    let avatar = OpenApiRouter::new()
        .routes(routes!(handlers::auth::upload_avatar))
        .layer(handlers::auth::avatar_body_limit());

    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::refresh_token))
        .routes(routes!(handlers::auth::verify_email))
        .routes(routes!(handlers::auth::resend_verification))
        .routes(routes!(handlers::auth::request_password_reset))
        .routes(routes!(handlers::auth::reset_password))
        .routes(routes!(handlers::auth::update_email))
        .merge(avatar)
}

fn movie_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::movie::list_movies,
            handlers::movie::add_movie
        ))
        .routes(routes!(
            handlers::movie::get_movie,
            handlers::movie::update_movie,
            handlers::movie::delete_movie
        ))
        .routes(routes!(handlers::movie::toggle_favorite))
}

fn watchlist_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::watchlist::list_watchlists,
            handlers::watchlist::create_watchlist
        ))
        .routes(routes!(handlers::watchlist::list_public_watchlists))
        .routes(routes!(
            handlers::watchlist::get_watchlist,
            handlers::watchlist::update_watchlist,
            handlers::watchlist::delete_watchlist
        ))
        .routes(routes!(
            handlers::watchlist::list_watchlist_movies,
            handlers::watchlist::add_watchlist_movie
        ))
        .routes(routes!(handlers::watchlist::remove_watchlist_movie))
        .routes(routes!(handlers::watchlist::list_watchlist_entries))
}

fn favorite_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::favorite::list_favorites,
            handlers::favorite::add_favorite
        ))
        .routes(routes!(handlers::favorite::remove_favorite))
        .routes(routes!(handlers::favorite::favorite_status))
}

fn review_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::review::list_my_reviews))
        .routes(routes!(
            handlers::review::list_movie_reviews,
            handlers::review::create_review
        ))
        .routes(routes!(
            handlers::review::get_review,
            handlers::review::update_review,
            handlers::review::delete_review
        ))
}

fn post_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::post::list_my_posts,
            handlers::post::create_post
        ))
        .routes(routes!(handlers::post::get_feed))
        .routes(routes!(
            handlers::post::get_post,
            handlers::post::update_post,
            handlers::post::delete_post
        ))
        .routes(routes!(
            handlers::post::like_post,
            handlers::post::unlike_post
        ))
        .routes(routes!(
            handlers::post::list_comments,
            handlers::post::add_comment
        ))
        .routes(routes!(
            handlers::post::update_comment,
            handlers::post::delete_comment
        ))
}

fn analytics_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::analytics::endpoint_analytics))
        .routes(routes!(handlers::analytics::user_analytics))
        .routes(routes!(handlers::analytics::system_analytics))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::dashboard))
        .routes(routes!(handlers::admin::request_logs))
}
