use serde_json::json;

use crate::common::{TestApp, routes};

async fn add_movie(app: &TestApp, client: &reqwest::Client, title: &str, tmdb_id: &str) -> i64 {
    let res = app
        .post(
            client,
            routes::MOVIES,
            &json!({"title": title, "tmdb_id": tmdb_id}),
        )
        .await;
    assert_eq!(res.status, 201, "Add movie failed: {}", res.text);
    res.body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn the_full_weekend_scenario() {
    let app = TestApp::spawn().await;

    // Register alice, verify the email, log in; cookies now ride the client.
    let client = app.signup("alice").await;

    let res = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await;
    assert_eq!(res.status, 201, "Create watchlist failed: {}", res.text);
    let watchlist_id = res.body["id"].as_i64().unwrap();

    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;

    let res = app
        .post(
            &client,
            &routes::watchlist_movies(watchlist_id),
            &json!({"movie_id": movie_id}),
        )
        .await;
    assert_eq!(res.status, 201, "Add to watchlist failed: {}", res.text);

    let res = app.get(&client, &routes::watchlist_movies(watchlist_id)).await;
    assert_eq!(res.status, 200);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["tmdb_id"], "603");
}

#[tokio::test]
async fn watchlist_names_are_unique_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let body = json!({"name": "Weekend"});
    assert_eq!(app.post(&alice, routes::WATCHLISTS, &body).await.status, 201);

    let res = app.post(&alice, routes::WATCHLISTS, &body).await;
    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");

    // A different user may reuse the name.
    assert_eq!(app.post(&bob, routes::WATCHLISTS, &body).await.status, 201);
}

#[tokio::test]
async fn adding_the_same_movie_twice_conflicts() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let watchlist_id = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;

    let body = json!({"movie_id": movie_id});
    let first = app
        .post(&client, &routes::watchlist_movies(watchlist_id), &body)
        .await;
    assert_eq!(first.status, 201);

    let second = app
        .post(&client, &routes::watchlist_movies(watchlist_id), &body)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "CONFLICT");
}

#[tokio::test]
async fn removing_a_movie_that_is_not_a_member_is_a_404() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let watchlist_id = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;

    let res = app
        .delete(&client, &routes::watchlist_movie(watchlist_id, movie_id))
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn adding_an_unknown_movie_is_a_404() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let watchlist_id = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    let res = app
        .post(
            &client,
            &routes::watchlist_movies(watchlist_id),
            &json!({"movie_id": 999_999}),
        )
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn private_watchlists_are_hidden_from_other_users() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let private_id = app
        .post(&alice, routes::WATCHLISTS, &json!({"name": "Secret"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    let public_id = app
        .post(
            &alice,
            routes::WATCHLISTS,
            &json!({"name": "Shared", "is_public": true}),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    let res = app.get(&bob, &routes::watchlist(private_id)).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");

    let res = app.get(&bob, &routes::watchlist(public_id)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["name"], "Shared");

    // Public listing shows only the public one.
    let res = app.get(&bob, routes::PUBLIC_WATCHLISTS).await;
    assert_eq!(res.body["meta"]["total"], 1);
    assert_eq!(res.body["data"][0]["name"], "Shared");

    // But even a public list can only be modified by its owner.
    let res = app
        .put(&bob, &routes::watchlist(public_id), &json!({"name": "Mine now"}))
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn updating_supports_clearing_the_description() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let id = app
        .post(
            &client,
            routes::WATCHLISTS,
            &json!({"name": "Weekend", "description": "Saturday night picks"}),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    // Omitting the field keeps it.
    let res = app
        .put(&client, &routes::watchlist(id), &json!({"name": "Weekend+"}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["description"], "Saturday night picks");

    // Explicit null clears it.
    let res = app
        .put(&client, &routes::watchlist(id), &json!({"description": null}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["description"], serde_json::Value::Null);
}

#[tokio::test]
async fn deleting_a_watchlist_cascades_to_its_entries() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let watchlist_id = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;
    app.post(
        &client,
        &routes::watchlist_movies(watchlist_id),
        &json!({"movie_id": movie_id}),
    )
    .await;

    let res = app.delete(&client, &routes::watchlist(watchlist_id)).await;
    assert_eq!(res.status, 204);

    // The watchlist and its entries are gone; the movie itself survives.
    let res = app.get(&client, &routes::watchlist(watchlist_id)).await;
    assert_eq!(res.status, 404);
    let res = app.get(&client, &routes::movie(movie_id)).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn entries_expose_the_raw_junction_rows() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let watchlist_id = app
        .post(&client, routes::WATCHLISTS, &json!({"name": "Weekend"}))
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;
    app.post(
        &client,
        &routes::watchlist_movies(watchlist_id),
        &json!({"movie_id": movie_id}),
    )
    .await;

    let res = app.get(&client, &routes::watchlist_entries(watchlist_id)).await;
    assert_eq!(res.status, 200);
    let entries = res.body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["movie_id"], movie_id);
    assert_eq!(entries[0]["watchlist_id"], watchlist_id);
}
