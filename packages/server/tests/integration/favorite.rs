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
async fn a_movie_can_be_favorited_once() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;

    let body = json!({"movie_id": movie_id});
    let first = app.post(&client, routes::FAVORITES, &body).await;
    assert_eq!(first.status, 201, "Favorite failed: {}", first.text);

    let second = app.post(&client, routes::FAVORITES, &body).await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "CONFLICT");

    let res = app.get(&client, &routes::favorite_status(movie_id)).await;
    assert_eq!(res.body["is_favorite"], true);
}

#[tokio::test]
async fn favoriting_an_unknown_movie_is_a_404() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let res = app
        .post(&client, routes::FAVORITES, &json!({"movie_id": 999_999}))
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn removing_a_favorite_is_not_idempotent() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    let movie_id = add_movie(&app, &client, "The Matrix", "603").await;

    app.post(&client, routes::FAVORITES, &json!({"movie_id": movie_id}))
        .await;

    let first = app.delete(&client, &routes::favorite(movie_id)).await;
    assert_eq!(first.status, 204);

    let second = app.delete(&client, &routes::favorite(movie_id)).await;
    assert_eq!(second.status, 404);

    let res = app.get(&client, &routes::favorite_status(movie_id)).await;
    assert_eq!(res.body["is_favorite"], false);
}

#[tokio::test]
async fn listing_returns_the_favorited_movies() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;

    let matrix = add_movie(&app, &client, "The Matrix", "603").await;
    let _alien = add_movie(&app, &client, "Alien", "348").await;

    app.post(&client, routes::FAVORITES, &json!({"movie_id": matrix}))
        .await;

    let res = app.get(&client, routes::FAVORITES).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["meta"]["total"], 1);
    assert_eq!(res.body["data"][0]["title"], "The Matrix");

    // Search applies within the favorites.
    let res = app
        .get(&client, &format!("{}?search=alien", routes::FAVORITES))
        .await;
    assert_eq!(res.body["meta"]["total"], 0);
}

#[tokio::test]
async fn favorites_are_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let movie_id = add_movie(&app, &alice, "The Matrix", "603").await;
    app.post(&alice, routes::FAVORITES, &json!({"movie_id": movie_id}))
        .await;

    let res = app.get(&bob, routes::FAVORITES).await;
    assert_eq!(res.body["meta"]["total"], 0);
    let res = app.get(&bob, &routes::favorite_status(movie_id)).await;
    assert_eq!(res.body["is_favorite"], false);
}
