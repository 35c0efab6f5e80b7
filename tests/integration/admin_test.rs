//! Admin dashboard, moderation, uploads, users, and system view.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use crate::helpers::{TestApp, TestResponse};

const BOUNDARY: &str = "abdullahhub-test-boundary";

async fn upload(app: &TestApp, token: &str, filename: &str, contents: &str) -> TestResponse {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/admin/upload-plugin")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request");
    app.send(req).await
}

fn manifest(name: &str) -> String {
    json!({
        "name": name,
        "description": "Uploaded during tests",
        "category": "Testing",
        "runtime": "command",
        "entry": {"command": "sh", "args": ["-c", "cat > /dev/null; printf '{\"success\": true}'"]},
    })
    .to_string()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_admin_routes_reject_regular_users() {
    let app = TestApp::with_database().await;
    let (_, token) = app.create_user("regular", false).await;

    for path in ["/admin", "/admin/plugins", "/admin/users", "/admin/system"] {
        let response = app.request("GET", path, None, Some(&token)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(response.error(), "Admin access required");
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_upload_is_pending_until_approved() {
    let app = TestApp::with_database().await;
    let (_, admin) = app.create_user("root", true).await;
    let (_, user) = app.create_user("shopper", false).await;

    let uploaded = upload(&app, &admin, "plugin.json", &manifest("Word Counter")).await;
    assert_eq!(uploaded.status, StatusCode::OK, "{:?}", uploaded.body);
    let plugin = &uploaded.body["data"]["plugin"];
    assert_eq!(plugin["slug"], "word-counter");
    assert_eq!(plugin["is_approved"], false);
    assert_eq!(uploaded.body["data"]["loaded"], true);
    let id = plugin["id"].as_str().expect("id").to_string();

    let pending = app
        .request("GET", "/admin/plugins?status=pending", None, Some(&admin))
        .await;
    let listed = pending.body["plugins"].as_array().expect("array");
    assert!(listed.iter().any(|p| p["id"] == id.as_str()));

    let hidden = app
        .request("POST", &format!("/plugins/install/{id}"), None, Some(&user))
        .await;
    assert_ne!(hidden.status, StatusCode::OK);

    let approved = app
        .request(
            "POST",
            &format!("/admin/plugins/{id}/approve"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["plugin"]["is_approved"], true);

    let installed = app
        .request("POST", &format!("/plugins/install/{id}"), None, Some(&user))
        .await;
    assert_eq!(installed.status, StatusCode::OK);
    assert_eq!(installed.body["success"], true);

    let duplicate = upload(&app, &admin, "plugin.json", &manifest("Word Counter")).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_upload_rejects_bad_packages() {
    let app = TestApp::with_database().await;
    let (_, admin) = app.create_user("root", true).await;

    let wrong_type = upload(&app, &admin, "notes.txt", "hello").await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);

    let empty = upload(&app, &admin, "plugin.json", "").await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.error(), "No file provided");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_moderation_actions() {
    let app = TestApp::with_database().await;
    let (_, admin) = app.create_user("root", true).await;
    let uploaded = upload(&app, &admin, "plugin.json", &manifest("Toggler")).await;
    let id = uploaded.body["data"]["plugin"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let bogus = app
        .request("POST", &format!("/admin/plugins/{id}/publish"), None, Some(&admin))
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);

    let approved = app
        .request("POST", &format!("/admin/plugins/{id}/approve"), None, Some(&admin))
        .await;
    assert_eq!(approved.body["plugin"]["is_active"], true);

    let toggled = app
        .request("POST", &format!("/admin/plugins/{id}/toggle"), None, Some(&admin))
        .await;
    assert_eq!(toggled.body["plugin"]["is_active"], false);

    let deleted = app
        .request("POST", &format!("/admin/plugins/{id}/delete"), None, Some(&admin))
        .await;
    assert_eq!(deleted.body["plugin"]["is_archived"], true);

    let all = app.request("GET", "/admin/plugins", None, Some(&admin)).await;
    let listed = all.body["plugins"].as_array().expect("array");
    assert!(listed.iter().all(|p| p["id"] != id.as_str()));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_overview_users_and_system() {
    let app = TestApp::with_database().await;
    let (_, admin) = app.create_user("root", true).await;
    app.create_user("someone", false).await;

    let overview = app.request("GET", "/admin", None, Some(&admin)).await;
    assert_eq!(overview.status, StatusCode::OK);
    assert_eq!(overview.body["data"]["total_users"], 2);
    let recent = overview.body["data"]["recent_users"].as_array().expect("array");
    assert!(recent.iter().all(|u| u.get("password_hash").is_none()));

    let users = app
        .request("GET", "/admin/users?page=1&page_size=1", None, Some(&admin))
        .await;
    assert_eq!(users.body["data"]["total"], 2);
    assert_eq!(users.body["data"]["items"].as_array().map(Vec::len), Some(1));

    let system = app.request("GET", "/admin/system", None, Some(&admin)).await;
    assert_eq!(system.status, StatusCode::OK);
    assert!(system.body["logs"].is_array());
    assert!(system.body["loaded_plugins"].is_array());
}
