use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// "development" or "production"; controls cookie Secure flags.
    pub environment: String,
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Signs access tokens and CSRF tokens.
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Signs password-reset codes; falls back to jwt_secret when empty.
    pub reset_token_secret: String,
}

impl AuthConfig {
    pub fn reset_secret(&self) -> &str {
        if self.reset_token_secret.is_empty() {
            &self.jwt_secret
        } else {
            &self.reset_token_secret
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Fixed window length in seconds.
    pub window_secs: u64,
    /// Maximum requests per IP per window.
    pub max_requests: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    /// Directory served at /uploads; avatars land in an avatars/ subdir.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub uploads: UploadsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.environment", "development")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.reset_token_secret", "")?
            .set_default("rate_limit.window_secs", 900)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("uploads.dir", "./uploads")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CINELOG__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CINELOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
