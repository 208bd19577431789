use serde_json::json;

use crate::common::{TestApp, routes};

async fn add_movie(app: &TestApp, client: &reqwest::Client) -> i64 {
    let res = app
        .post(
            client,
            routes::MOVIES,
            &json!({"title": "The Matrix", "tmdb_id": "603"}),
        )
        .await;
    assert_eq!(res.status, 201, "Add movie failed: {}", res.text);
    res.body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn a_movie_can_be_reviewed_once_per_user() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    let movie_id = add_movie(&app, &client).await;

    let body = json!({"content": "Still holds up", "rating": 9});
    let first = app
        .post(&client, &routes::movie_reviews(movie_id), &body)
        .await;
    assert_eq!(first.status, 201, "Review failed: {}", first.text);

    let second = app
        .post(&client, &routes::movie_reviews(movie_id), &body)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "CONFLICT");
}

#[tokio::test]
async fn review_ratings_are_one_to_ten() {
    let app = TestApp::spawn().await;
    let client = app.signup("alice").await;
    let movie_id = add_movie(&app, &client).await;

    let res = app
        .post(
            &client,
            &routes::movie_reviews(movie_id),
            &json!({"content": "meh", "rating": 0}),
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn only_the_author_can_update_or_delete_a_review() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let movie_id = add_movie(&app, &alice).await;

    let review_id = app
        .post(
            &alice,
            &routes::movie_reviews(movie_id),
            &json!({"content": "Still holds up", "rating": 9}),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    let res = app
        .put(&bob, &routes::review(review_id), &json!({"content": "rubbish"}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");

    let res = app.delete(&bob, &routes::review(review_id)).await;
    assert_eq!(res.status, 403);

    let res = app
        .put(
            &alice,
            &routes::review(review_id),
            &json!({"content": "Better on rewatch", "rating": 10}),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["rating"], 10);

    let res = app.delete(&alice, &routes::review(review_id)).await;
    assert_eq!(res.status, 204);
}

#[tokio::test]
async fn private_reviews_are_hidden_from_other_readers() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let movie_id = add_movie(&app, &alice).await;

    let public_id = app
        .post(
            &alice,
            &routes::movie_reviews(movie_id),
            &json!({"content": "Public take", "rating": 8}),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    let private_id = app
        .post(
            &bob,
            &routes::movie_reviews(movie_id),
            &json!({"content": "Private notes", "rating": 6, "is_public": false}),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    // Alice sees the public review plus her own, not bob's private one.
    let res = app.get(&alice, &routes::movie_reviews(movie_id)).await;
    let contents: Vec<&str> = res.body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["Public take"]);

    let res = app.get(&alice, &routes::review(private_id)).await;
    assert_eq!(res.status, 403);

    // Bob sees both: the public one and his own private one.
    let res = app.get(&bob, &routes::movie_reviews(movie_id)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);

    let res = app.get(&bob, &routes::review(public_id)).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn my_reviews_lists_only_the_callers() {
    let app = TestApp::spawn().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let movie_id = add_movie(&app, &alice).await;

    app.post(
        &alice,
        &routes::movie_reviews(movie_id),
        &json!({"content": "Mine", "rating": 9}),
    )
    .await;
    app.post(
        &bob,
        &routes::movie_reviews(movie_id),
        &json!({"content": "Bob's", "rating": 5}),
    )
    .await;

    let res = app.get(&alice, routes::REVIEWS).await;
    let reviews = res.body.as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["content"], "Mine");
}
