//! Marketplace, installation, configuration, rating, and execution.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::helpers::TestApp;

const ECHO_ANSWER: &str = r#"{"success": true, "message": "pong"}"#;

/// Installs the `echo` plugin, registers it, and returns its catalog id.
async fn echo_plugin(app: &TestApp, answer: &str) -> String {
    app.install_echo_plugin("echo", answer).await;
    register(app, "echo").await
}

/// Registers a loaded plugin in the catalog and returns its id.
async fn register(app: &TestApp, slug: &str) -> String {
    let created = app.state.catalog_service.sync().await.expect("sync");
    assert_eq!(created, vec![slug.to_string()]);

    let plugin = app
        .state
        .catalog_service
        .list(false)
        .await
        .expect("list")
        .into_iter()
        .find(|p| p.slug == slug)
        .expect("plugin registered");
    plugin.id.to_string()
}

fn find_listed<'a>(body: &'a Value, id: &str) -> Option<&'a Value> {
    body["data"]["items"]
        .as_array()?
        .iter()
        .find(|p| p["id"] == id)
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_install_execute_uninstall_flow() {
    let app = TestApp::with_database().await;
    let id = echo_plugin(&app, ECHO_ANSWER).await;
    let (_, token) = app.create_user("abdullah", false).await;

    let market = app
        .request("GET", "/plugins/marketplace", None, Some(&token))
        .await;
    assert_eq!(market.status, StatusCode::OK);
    assert!(find_listed(&market.body, &id).is_some());

    let installed = app
        .request("POST", &format!("/plugins/install/{id}"), None, Some(&token))
        .await;
    assert_eq!(installed.status, StatusCode::OK);
    assert_eq!(installed.body["success"], true);
    assert_eq!(installed.body["installation"]["plugin_id"], id.as_str());

    let again = app
        .request("POST", &format!("/plugins/install/{id}"), None, Some(&token))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["success"], false);
    assert_eq!(again.body["message"], "Plugin already installed");

    let run = app
        .request(
            "POST",
            &format!("/plugins/execute/{id}"),
            Some(json!({"text": "ping"})),
            Some(&token),
        )
        .await;
    assert_eq!(run.status, StatusCode::OK, "{:?}", run.body);
    assert_eq!(run.body["success"], true);

    let dashboard = app.request("GET", "/dashboard", None, Some(&token)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["stats"]["plugins_installed"], 1);
    assert_eq!(dashboard.body["stats"]["api_calls"], 1);

    let removed = app
        .request("POST", &format!("/plugins/uninstall/{id}"), None, Some(&token))
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let denied = app
        .request("POST", &format!("/plugins/execute/{id}"), None, Some(&token))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.error(), "Plugin not installed");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_declined_answer_is_relayed_with_200() {
    let app = TestApp::with_database().await;
    let id = echo_plugin(&app, r#"{"success": false, "error": "quota exceeded"}"#).await;
    let (_, token) = app.create_user("decliner", false).await;
    app.request("POST", &format!("/plugins/install/{id}"), None, Some(&token))
        .await;

    let run = app
        .request("POST", &format!("/plugins/execute/{id}"), None, Some(&token))
        .await;

    assert_eq!(run.status, StatusCode::OK);
    assert_eq!(run.body["success"], false);
    assert_eq!(run.body["error"], "quota exceeded");
}

async fn downloads(app: &TestApp, slug: &str) -> i64 {
    app.state
        .catalog_service
        .list(false)
        .await
        .expect("list")
        .into_iter()
        .find(|p| p.slug == slug)
        .expect("plugin registered")
        .download_count
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_download_count_follows_installations() {
    let app = TestApp::with_database().await;
    let id = echo_plugin(&app, ECHO_ANSWER).await;
    let (_, token) = app.create_user("counter", false).await;
    let install = format!("/plugins/install/{id}");

    let first = app.request("POST", &install, None, Some(&token)).await;
    assert_eq!(first.body["success"], true);
    assert_eq!(downloads(&app, "echo").await, 1);

    let repeat = app.request("POST", &install, None, Some(&token)).await;
    assert_eq!(repeat.body["message"], "Plugin already installed");
    assert_eq!(downloads(&app, "echo").await, 1);

    app.request("POST", &format!("/plugins/uninstall/{id}"), None, Some(&token))
        .await;
    let again = app.request("POST", &install, None, Some(&token)).await;
    assert_eq!(again.body["success"], true);
    assert_eq!(downloads(&app, "echo").await, 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_broken_plugins_fail_with_500() {
    let app = TestApp::with_database().await;
    let (_, token) = app.create_user("breaker", false).await;

    for (slug, script, expected) in [
        ("garbled", "cat > /dev/null; printf 'not-json'", ""),
        ("crasher", "cat > /dev/null; echo boom >&2; exit 3", "exited with code 3"),
    ] {
        app.install_script_plugin(slug, script).await;
        let id = register(&app, slug).await;
        let installed = app
            .request("POST", &format!("/plugins/install/{id}"), None, Some(&token))
            .await;
        assert_eq!(installed.status, StatusCode::OK, "{slug}: {:?}", installed.body);

        let run = app
            .request("POST", &format!("/plugins/execute/{id}"), None, Some(&token))
            .await;
        assert_eq!(run.status, StatusCode::INTERNAL_SERVER_ERROR, "{slug}");
        assert_eq!(run.body["success"], false);
        assert_eq!(run.body["code"], "PLUGIN_ERROR");
        assert!(!run.error().is_empty(), "{slug}: error message hidden");
        assert_ne!(run.error(), "Internal server error");
        assert!(run.error().contains(expected), "{slug}: {}", run.error());
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_config_merge_and_rating() {
    let app = TestApp::with_database().await;
    let id = echo_plugin(&app, ECHO_ANSWER).await;
    let (_, token) = app.create_user("configurer", false).await;

    let not_installed = app
        .request(
            "POST",
            &format!("/plugins/{id}/rate"),
            Some(json!({"rating": 4})),
            Some(&token),
        )
        .await;
    assert_eq!(not_installed.status, StatusCode::FORBIDDEN);

    app.request("POST", &format!("/plugins/install/{id}"), None, Some(&token))
        .await;

    let first = app
        .request(
            "PUT",
            &format!("/plugins/{id}/config"),
            Some(json!({"mode": "fast", "size": "auto"})),
            Some(&token),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let second = app
        .request(
            "PUT",
            &format!("/plugins/{id}/config"),
            Some(json!({"size": "full"})),
            Some(&token),
        )
        .await;
    assert_eq!(second.body["config"], json!({"mode": "fast", "size": "full"}));

    let out_of_range = app
        .request(
            "POST",
            &format!("/plugins/{id}/rate"),
            Some(json!({"rating": 6})),
            Some(&token),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let rated = app
        .request(
            "POST",
            &format!("/plugins/{id}/rate"),
            Some(json!({"rating": 4})),
            Some(&token),
        )
        .await;
    assert_eq!(rated.status, StatusCode::OK);
    assert_eq!(rated.body["review_count"], 1);
    assert_eq!(rated.body["rating"], 4.0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unknown_and_malformed_plugin_ids() {
    let app = TestApp::with_database().await;
    let (_, token) = app.create_user("visitor", false).await;

    let malformed = app
        .request("GET", "/plugins/not-a-uuid", None, Some(&token))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .request(
            "GET",
            "/plugins/0191c4a0-0000-7000-8000-000000000001",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_public_listing_hides_internal_fields() {
    let app = TestApp::with_database().await;
    let id = echo_plugin(&app, ECHO_ANSWER).await;

    let listing = app.request("GET", "/api/v1/plugins", None, None).await;

    assert_eq!(listing.status, StatusCode::OK);
    let plugins = listing.body["plugins"].as_array().expect("array");
    let echo = plugins.iter().find(|p| p["id"] == id.as_str()).expect("listed");
    assert_eq!(echo["name"], "echo");
    assert!(echo.get("file_path").is_none());
}
