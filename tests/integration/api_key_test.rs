//! Stored credentials and the `X-API-Key` execution endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use crate::helpers::{TestApp, TestResponse};

async fn public_execute(app: &TestApp, key: &str, plugin_id: &str) -> TestResponse {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/execute")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", key)
        .body(Body::from(
            json!({"plugin_id": plugin_id, "input": {"text": "hi"}}).to_string(),
        ))
        .expect("request");
    app.send(req).await
}

async fn registered(app: &TestApp, slug: &str) -> String {
    app.install_echo_plugin(slug, r#"{"success": true}"#).await;
    app.state.catalog_service.sync().await.expect("sync");
    app.state
        .catalog_service
        .list(false)
        .await
        .expect("list")
        .into_iter()
        .find(|p| p.slug == slug)
        .map(|p| p.id.to_string())
        .expect("registered")
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_generated_key_executes_its_plugin_only() {
    let app = TestApp::with_database().await;
    let echo = registered(&app, "echo").await;
    let other = registered(&app, "other").await;
    let (_, token) = app.create_user("integrator", false).await;

    let stored = app
        .request(
            "POST",
            "/api/keys",
            Some(json!({"plugin_id": echo, "name": "ci"})),
            Some(&token),
        )
        .await;
    assert_eq!(stored.status, StatusCode::OK, "{:?}", stored.body);
    let key = stored.body["api_key"]["generated_key"]
        .as_str()
        .expect("generated key returned once")
        .to_string();
    assert!(stored.body["api_key"]["generated_secret"].is_string());

    let listed = app.request("GET", "/api/keys", None, Some(&token)).await;
    let keys = listed.body["api_keys"].as_array().expect("array");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["plugin_name"], "echo");
    let masked = keys[0]["api_key"].as_str().expect("masked");
    assert!(masked.starts_with("********"));
    assert!(!masked.contains(&key));

    let ok = public_execute(&app, &key, &echo).await;
    assert_eq!(ok.status, StatusCode::OK, "{:?}", ok.body);
    assert_eq!(ok.body["success"], true);

    let wrong_plugin = public_execute(&app, &key, &other).await;
    assert_eq!(wrong_plugin.status, StatusCode::FORBIDDEN);

    let missing_plugin =
        public_execute(&app, &key, "0191c4a0-0000-7000-8000-000000000001").await;
    assert_eq!(missing_plugin.status, StatusCode::NOT_FOUND);

    let bad_key = public_execute(&app, "not-a-real-key", &echo).await;
    assert_eq!(bad_key.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_key.error(), "Invalid or expired API key");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_store_validates_and_delete_is_owner_scoped() {
    let app = TestApp::with_database().await;
    let echo = registered(&app, "echo").await;
    let (_, alice) = app.create_user("alice", false).await;
    let (_, bob) = app.create_user("bob", false).await;

    let unknown = app
        .request(
            "POST",
            "/api/keys",
            Some(json!({"plugin_id": "0191c4a0-0000-7000-8000-000000000001", "api_key": "k"})),
            Some(&alice),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let expired = app
        .request(
            "POST",
            "/api/keys",
            Some(json!({
                "plugin_id": echo,
                "api_key": "sk-live-1234567890",
                "expires_at": "2001-01-01T00:00:00Z",
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(expired.status, StatusCode::BAD_REQUEST);

    let stored = app
        .request(
            "POST",
            "/api/keys",
            Some(json!({"plugin_id": echo, "api_key": "sk-live-1234567890"})),
            Some(&alice),
        )
        .await;
    assert_eq!(stored.status, StatusCode::OK);
    assert!(stored.body["api_key"].get("generated_key").is_none());
    let key_id = stored.body["api_key"]["key"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let foreign = app
        .request("DELETE", &format!("/api/keys/{key_id}"), None, Some(&bob))
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let deleted = app
        .request("DELETE", &format!("/api/keys/{key_id}"), None, Some(&alice))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .request("DELETE", &format!("/api/keys/{key_id}"), None, Some(&alice))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}
