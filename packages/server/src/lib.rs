pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use axum::Json;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cinelog API",
        version = "1.0.0",
        description = "Movie diary and social backend: watched movies, watchlists, favorites, reviews, and posts"
    ),
    tags(
        (name = "Auth", description = "Registration, login, tokens, and account email lifecycle"),
        (name = "Movies", description = "Per-user watched-movie log"),
        (name = "Watchlists", description = "Named movie collections, optionally public"),
        (name = "Favorites", description = "Bookmarked movies"),
        (name = "Reviews", description = "Movie reviews"),
        (name = "Posts", description = "Social posts with likes and comments"),
        (name = "Analytics", description = "Request analytics reads (admin)"),
        (name = "Admin", description = "Role-gated dashboards"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "message": "Server is running" }))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-api-client"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(config.server.cors.max_age))
}

/// Build the application router.
///
/// Request flow, outermost first: rate limit, CORS, analytics, CSRF, then the
/// route handlers (auth happens per-handler via the `AuthUser` extractor).
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    let cors = cors_layer(&state.config);

    router
        .route("/health", get(health))
        .route(
            "/api/v1/csrf-token",
            get(middleware::csrf::issue_csrf_token),
        )
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf::require_csrf_token,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::analytics::track_requests,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce_rate_limit,
        ))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
