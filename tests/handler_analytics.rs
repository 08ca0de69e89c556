mod common;

use axum_test::TestServer;
use url_pulse::api::dto::analytics::AnalyticsResponse;

#[tokio::test]
async fn test_analytics_reports_counter() {
    let state = common::create_test_state();
    common::create_test_link(&state, "stat01", "https://example.com/page").await;
    let server = TestServer::new(common::test_router(state)).unwrap();

    server.get("/stat01").await;
    server.get("/stat01").await;

    let response = server.get("/analytics/stat01").await;

    response.assert_status_ok();

    let body = response.json::<AnalyticsResponse>();
    assert_eq!(body.short_code, "stat01");
    assert_eq!(body.original_url, "https://example.com/page");
    assert_eq!(body.redirect_count, 2);
}

#[tokio::test]
async fn test_analytics_does_not_count_as_redirect() {
    let state = common::create_test_state();
    common::create_test_link(&state, "stat02", "https://example.com").await;
    let server = TestServer::new(common::test_router(state)).unwrap();

    server.get("/analytics/stat02").await.assert_status_ok();
    let body = server
        .get("/analytics/stat02")
        .await
        .json::<AnalyticsResponse>();

    assert_eq!(body.redirect_count, 0);
}

#[tokio::test]
async fn test_analytics_not_found() {
    let state = common::create_test_state();
    let server = TestServer::new(common::test_router(state)).unwrap();

    let response = server.get("/analytics/nope42").await;

    response.assert_status_not_found();
}
