pub mod analytics;
pub mod csrf;
pub mod rate_limit;
