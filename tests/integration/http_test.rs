//! Behaviour that holds without a database: authentication guards,
//! rate limiting, fallbacks, and response headers.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use abdullahhub_core::config::RateLimitRule;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["status"], "unhealthy");
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::new().await;

    for (method, path) in [
        ("GET", "/dashboard"),
        ("GET", "/plugins/marketplace"),
        ("POST", "/plugins/install/0191c4a0-0000-7000-8000-000000000001"),
        ("POST", "/plugins/execute/0191c4a0-0000-7000-8000-000000000001"),
        ("GET", "/api/keys"),
        ("GET", "/admin"),
        ("GET", "/admin/system"),
    ] {
        let response = app.request(method, path, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{method} {path}");
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["code"], "UNAUTHORIZED");
        assert_eq!(response.error(), "Missing or invalid Authorization header");
    }
}

#[tokio::test]
async fn test_garbage_token_is_rejected_before_database() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", "/dashboard", None, Some("not-a-jwt"))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "Invalid token");
}

#[tokio::test]
async fn test_public_execute_requires_api_key() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/v1/execute",
            Some(json!({"plugin_id": "0191c4a0-0000-7000-8000-000000000001"})),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "API key required");
}

#[tokio::test]
async fn test_public_execute_rejects_malformed_body() {
    let app = TestApp::new().await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/execute")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", "ah_live_whatever")
        .body(Body::from(r#"{"input": {}}"#))
        .expect("request");

    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
    assert!(response.error().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_unknown_route_is_json_404_with_security_headers() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/no/such/page", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(
        response.headers["referrer-policy"],
        "strict-origin-when-cross-origin"
    );
}

#[tokio::test]
async fn test_route_limit_returns_429_with_retry_after() {
    let app = TestApp::with_config(|c| c.rate_limit.install = RateLimitRule::new(1, 3600)).await;
    let path = "/plugins/install/0191c4a0-0000-7000-8000-000000000001";

    let first = app.request("POST", path, None, None).await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);

    let second = app.request("POST", path, None, None).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.body["success"], false);
    assert_eq!(
        second.error(),
        "Rate limit exceeded. Please try again later."
    );
    let retry_after: u64 = second.headers[header::RETRY_AFTER]
        .to_str()
        .expect("ascii")
        .parse()
        .expect("seconds");
    assert!(retry_after > 0 && retry_after <= 3600);

    // Other routes keep their own budget.
    let other = app.request("GET", "/dashboard", None, None).await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_limits_are_per_client() {
    let app = TestApp::with_config(|c| c.rate_limit.public_list = RateLimitRule::new(1, 60)).await;
    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/plugins")
            .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
            .body(Body::empty())
            .expect("request")
    };

    // The first call per client gets past the limiter and fails on the
    // unreachable database instead.
    let a1 = app.send(from("203.0.113.7")).await;
    assert_ne!(a1.status, StatusCode::TOO_MANY_REQUESTS);
    let a2 = app.send(from("203.0.113.7")).await;
    assert_eq!(a2.status, StatusCode::TOO_MANY_REQUESTS);
    let b1 = app.send(from("198.51.100.2")).await;
    assert_ne!(b1.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_disabled_rate_limiting() {
    let app = TestApp::with_config(|c| {
        c.rate_limit.enabled = false;
        c.rate_limit.install = RateLimitRule::new(1, 3600);
    })
    .await;
    let path = "/plugins/install/0191c4a0-0000-7000-8000-000000000001";

    for _ in 0..3 {
        let response = app.request("POST", path, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = TestApp::with_config(|c| {
        c.rate_limit.default_hourly = RateLimitRule::new(1, 3600);
    })
    .await;

    for _ in 0..3 {
        let response = app.request("GET", "/health", None, None).await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
