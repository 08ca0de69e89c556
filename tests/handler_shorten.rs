mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use url_pulse::api::dto::shorten::ShortenResponse;
use url_pulse::api::middleware::rate_limit;
use url_pulse::api::routes::shorten_routes;
use url_pulse::domain::repositories::LinkRepository;

#[tokio::test]
async fn test_shorten_success() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state.clone())).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({ "url": "https://example.com/some/long/path" }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body = response.json::<ShortenResponse>();
    assert_eq!(body.short_code.len(), 6);
    assert!(body.short_code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(
        body.short_url,
        format!("{}/{}", common::BASE_URL, body.short_code)
    );

    let stored = state.links.find_by_code(&body.short_code).await.unwrap().unwrap();
    assert_eq!(stored.long_url, "https://example.com/some/long/path");
    assert_eq!(stored.redirect_count, 0);
}

#[tokio::test]
async fn test_shorten_same_url_twice_gives_distinct_codes() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state)).unwrap();

    let first = server
        .post("/shorten")
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json::<ShortenResponse>();
    let second = server
        .post("/shorten")
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json::<ShortenResponse>();

    assert_ne!(first.short_code, second.short_code);
}

#[tokio::test]
async fn test_shorten_invalid_url() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state)).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({ "url": "not-a-valid-url" }))
        .await;

    response.assert_status_bad_request();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_shorten_rejects_non_http_scheme() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state)).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({ "url": "ftp://example.com/file.txt" }))
        .await;

    response.assert_status_bad_request();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["message"], "Invalid URL format");
}

#[tokio::test]
async fn test_shorten_missing_url_field() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state)).unwrap();

    let response = server.post("/shorten").json(&json!({})).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_shorten_rate_limited_per_client() {
    let state = common::create_test_state();
    let app = shorten_routes()
        .layer(rate_limit::layer().unwrap())
        .layer(common::MockConnectInfoLayer)
        .with_state(state);
    let server = TestServer::new(app).unwrap();

    let mut statuses = Vec::new();
    for _ in 0..40 {
        let response = server
            .post("/shorten")
            .json(&json!({ "url": "https://example.com" }))
            .await;
        statuses.push(response.status_code());
    }

    assert_eq!(statuses[0], StatusCode::CREATED);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
