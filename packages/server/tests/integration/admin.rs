use std::time::Duration;

use sea_orm::EntityTrait;
use serde_json::json;

use server::entity::request_log;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn analytics_and_dashboards_require_the_admin_role() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    for path in [
        routes::ANALYTICS_ENDPOINTS,
        routes::ANALYTICS_USERS,
        routes::ANALYTICS_SYSTEM,
        routes::ADMIN_DASHBOARD,
        routes::ADMIN_REQUEST_LOGS,
    ] {
        let res = app.get(&client, path).await;
        assert_eq!(res.status, 403, "{path} open to non-admins");
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

#[tokio::test]
async fn an_admin_can_read_the_dashboard() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    app.make_admin("alice").await;

    app.post(
        &client,
        routes::MOVIES,
        &json!({"title": "The Matrix", "tmdb_id": "603"}),
    )
    .await;

    let res = app.get(&client, routes::ADMIN_DASHBOARD).await;
    assert_eq!(res.status, 200, "Dashboard failed: {}", res.text);
    assert_eq!(res.body["users"], 1);
    assert_eq!(res.body["movies"], 1);
    assert_eq!(res.body["posts"], 0);
}

#[tokio::test]
async fn request_logs_and_system_analytics_reflect_traffic() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    app.make_admin("alice").await;

    // Generate some tracked traffic, then wait for the async recorder.
    app.get(&client, routes::MOVIES).await;
    for _ in 0..50 {
        if request_log::Entity::find()
            .all(&app.db)
            .await
            .unwrap()
            .len()
            >= 1
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let res = app.get(&client, routes::ADMIN_REQUEST_LOGS).await;
    assert_eq!(res.status, 200);
    assert!(
        res.body["meta"]["total"].as_u64().unwrap() >= 1,
        "no logs listed: {}",
        res.text
    );

    let res = app.get(&client, routes::ANALYTICS_SYSTEM).await;
    assert_eq!(res.status, 200);
    assert!(res.body["total_requests"].as_u64().unwrap() >= 1);
    assert!(res.body["avg_response_time"].as_f64().is_some());
}

#[tokio::test]
async fn endpoint_aggregates_fold_repeated_requests_into_one_row() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    app.make_admin("alice").await;

    for _ in 0..3 {
        app.get(&client, routes::MOVIES).await;
    }

    // Wait until all three hits landed in the aggregate.
    let mut row = None;
    for _ in 0..50 {
        let res = app.get(&client, routes::ANALYTICS_ENDPOINTS).await;
        assert_eq!(res.status, 200);
        let found = res.body.as_array().unwrap().iter().find(|r| {
            r["endpoint"] == "/api/v1/movies" && r["method"] == "GET"
        }).cloned();
        if let Some(ref r) = found
            && r["total_requests"].as_i64().unwrap() >= 3
        {
            row = found;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let row = row.expect("aggregate row never reached 3 requests");
    assert_eq!(row["total_requests"], 3);
    assert_eq!(row["success_count"], 3);
    assert_eq!(row["error_count"], 0);
    assert!(row["min_response_time"].as_i64().unwrap() <= row["max_response_time"].as_i64().unwrap());
}

#[tokio::test]
async fn user_aggregates_track_the_acting_user() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    app.make_admin("alice").await;

    app.get(&client, routes::MOVIES).await;

    let mut found = false;
    for _ in 0..50 {
        let res = app.get(&client, routes::ANALYTICS_USERS).await;
        assert_eq!(res.status, 200);
        if res
            .body
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["user_id"].is_number() && r["total_requests"].as_i64().unwrap() >= 1)
        {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(found, "per-user aggregate never appeared");
}
