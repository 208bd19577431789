pub mod admin;
pub mod analytics;
pub mod auth;
pub mod favorite;
pub mod movie;
pub mod post;
pub mod review;
pub mod watchlist;
