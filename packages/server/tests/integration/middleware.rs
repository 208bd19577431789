use std::time::Duration;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::request_log;

use crate::common::{TestApp, routes};

mod csrf {
    use super::*;

    #[tokio::test]
    async fn mutating_requests_without_a_token_are_rejected_for_browser_clients() {
        let app = TestApp::spawn().await;
        let client = app.browser_client();

        let res = app
            .post(
                &client,
                routes::REGISTER,
                &json!({
                    "name": "Alice",
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "securepass",
                }),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "CSRF_MISMATCH");
    }

    #[tokio::test]
    async fn the_issued_token_passes_when_echoed_in_the_header() {
        let app = TestApp::spawn().await;
        let client = app.browser_client();

        let res = app.get(&client, routes::CSRF_TOKEN).await;
        assert_eq!(res.status, 200);
        let token = res.body["csrf_token"].as_str().unwrap().to_string();

        let res = client
            .post(app.url(routes::REGISTER))
            .header("X-CSRF-Token", &token)
            .json(&json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 201);
    }

    #[tokio::test]
    async fn a_header_that_does_not_match_the_cookie_is_rejected() {
        let app = TestApp::spawn().await;
        let client = app.browser_client();

        // Prime the cookie with a legitimate token.
        app.get(&client, routes::CSRF_TOKEN).await;

        let res = client
            .post(app.url(routes::REGISTER))
            .header("X-CSRF-Token", "0000.0000")
            .json(&json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 403);
    }

    #[tokio::test]
    async fn reads_and_mobile_clients_are_exempt() {
        let app = TestApp::spawn().await;

        // GET never needs a token.
        let browser = app.browser_client();
        let res = app.get(&browser, "/health").await;
        assert_eq!(res.status, 200);

        // The mobile-tagged client mutates freely.
        let mobile = app.client();
        let res = app
            .post(
                &mobile,
                routes::REGISTER,
                &json!({
                    "name": "Alice",
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "securepass",
                }),
            )
            .await;
        assert_eq!(res.status, 201);
    }
}

mod rate_limit {
    use super::*;

    #[tokio::test]
    async fn requests_over_the_window_budget_get_a_429() {
        let app = TestApp::spawn_with_config(|config| {
            config.rate_limit.max_requests = 3;
        })
        .await;
        let client = app.client();

        for i in 0..3 {
            let res = app.get(&client, "/health").await;
            assert_eq!(res.status, 200, "request {i} unexpectedly limited");
            assert_eq!(
                res.headers.get("RateLimit-Limit").unwrap().to_str().unwrap(),
                "3"
            );
        }

        let res = app.get(&client, "/health").await;
        assert_eq!(res.status, 429);
        assert_eq!(res.body["code"], "RATE_LIMITED");
        assert!(res.headers.contains_key("Retry-After"));
        assert_eq!(
            res.headers
                .get("RateLimit-Remaining")
                .unwrap()
                .to_str()
                .unwrap(),
            "0"
        );
    }

    #[tokio::test]
    async fn remaining_budget_counts_down_in_the_headers() {
        let app = TestApp::spawn_with_config(|config| {
            config.rate_limit.max_requests = 5;
        })
        .await;
        let client = app.client();

        let res = app.get(&client, "/health").await;
        assert_eq!(
            res.headers
                .get("RateLimit-Remaining")
                .unwrap()
                .to_str()
                .unwrap(),
            "4"
        );

        let res = app.get(&client, "/health").await;
        assert_eq!(
            res.headers
                .get("RateLimit-Remaining")
                .unwrap()
                .to_str()
                .unwrap(),
            "3"
        );
    }
}

mod analytics {
    use super::*;

    /// The analytics write is fire-and-forget, so poll briefly.
    async fn wait_for_logs(app: &TestApp, endpoint: &str) -> Vec<request_log::Model> {
        for _ in 0..50 {
            let rows = request_log::Entity::find()
                .filter(request_log::Column::Endpoint.eq(endpoint))
                .all(&app.db)
                .await
                .unwrap();
            if !rows.is_empty() {
                return rows;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("No request logs recorded for {endpoint}");
    }

    #[tokio::test]
    async fn requests_are_logged_with_normalized_endpoints() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        // A request with a numeric path segment.
        let res = app.get(&client, &routes::movie(42)).await;
        assert_eq!(res.status, 404);

        let rows = wait_for_logs(&app, "/api/v1/movies/:id").await;
        let row = &rows[0];
        assert_eq!(row.method, "GET");
        assert_eq!(row.path, "/api/v1/movies/42");
        assert_eq!(row.status_code, 404);
        assert!(row.user_id.is_some(), "authenticated request lost its user");
        assert!(row.response_time >= 0);
    }

    #[tokio::test]
    async fn the_health_check_is_not_logged() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.get(&client, "/health").await;
        // Generate one tracked request so we know the recorder has caught up.
        app.get(&client, routes::FEED).await;
        wait_for_logs(&app, "/api/v1/posts/feed").await;

        let rows = request_log::Entity::find()
            .filter(request_log::Column::Endpoint.eq("/health"))
            .all(&app.db)
            .await
            .unwrap();
        assert!(rows.is_empty(), "health checks should not be recorded");
    }
}
