pub mod endpoint_analytics;
pub mod favorite;
pub mod movie;
pub mod movie_review;
pub mod post;
pub mod post_comment;
pub mod post_like;
pub mod request_log;
pub mod user;
pub mod user_analytics;
pub mod watchlist;
pub mod watchlist_movie;
