mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use vempain_website::config::Environment;
use vempain_website::testing::{page_fixture, FailingAclStore};

const RESTRICTED_ACL: i64 = 40;

fn seed(app: &TestApp) {
    app.pages.insert(page_fixture(
        1,
        "index",
        "?><h1><?= $PAGE_INFO['title'] ?></h1><?php showGallery(12);",
    ));

    let mut members = page_fixture(2, "members", "echo 'members only';");
    members.acl_id = Some(RESTRICTED_ACL);
    app.pages.insert(members);
    app.acls.grant(RESTRICTED_ACL, 7);

    app.pages.insert(page_fixture(3, "broken", "echo 'half'; include('secrets.php');"));

    let mut empty_acl = page_fixture(4, "open-acl", "echo 'anyone';");
    empty_acl.acl_id = Some(99);
    app.pages.insert(empty_acl);
}

#[tokio::test]
async fn root_resolves_to_index_page() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let res = app.get("/").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({
            "body": "<h1>Page 1</h1><!--vps:embed:gallery:12-->",
            "header": "Header 1",
            "title": "Page 1",
            "creator": "admin",
            "published": "2023-11-14T22:13:20+00:00",
            "embeds": [
                {"type": "gallery", "galleryId": 12, "placeholder": "<!--vps:embed:gallery:12-->"}
            ]
        })
    );
    Ok(())
}

#[tokio::test]
async fn page_content_endpoint_uses_query_path() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let res = app.get("/api/public/page-content?path=open-acl").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["body"], "anyone");
    assert_eq!(res.body["embeds"], json!([]));

    let res = app.get("/api/public/page-content").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app.get("/api/public/page-content?path=").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/public/page-content?path=missing").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_and_reserved_paths_are_not_found() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    for path in ["/nope", "/api/unknown", "/file/image.jpg", "/health/deep"] {
        let res = app.get(path).await?;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "path {path}");
    }
    Ok(())
}

#[tokio::test]
async fn restricted_page_requires_login() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let res = app.get("/members").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn restricted_page_refuses_non_members() -> Result<()> {
    let app = TestApp::new();
    seed(&app);
    let token = app.token_for(8, "mallory", false).await?;

    let res = app.get_with_bearer("/members", &token).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "Forbidden");
    // The session itself is still refreshed
    assert!(res.refresh_token().is_some());
    Ok(())
}

#[tokio::test]
async fn restricted_page_serves_members_and_global_users() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let member = app.token_for(7, "alice", false).await?;
    let res = app.get_with_bearer("/members", &member).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["body"], "members only");

    let admin = app.token_for(1, "admin", true).await?;
    let res = app.get_with_cookie("/api/public/page-content?path=members", &admin).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn acl_without_members_is_public() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let res = app.get("/open-acl").await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn cached_page_is_still_gated() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let member = app.token_for(7, "alice", false).await?;
    let res = app.get_with_bearer("/members", &member).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.pages.cache_writes(), 1);

    let res = app.get("/members").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let outsider = app.token_for(8, "mallory", false).await?;
    let res = app.get_with_bearer("/members", &outsider).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn second_request_is_served_from_cache() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let first = app.get("/").await?;
    let second = app.get("/").await?;
    assert_eq!(first.body, second.body);
    assert_eq!(app.pages.cache_writes(), 1);
    Ok(())
}

#[tokio::test]
async fn render_failure_is_500_and_not_cached() -> Result<()> {
    let app = TestApp::new();
    seed(&app);

    let res = app.get("/broken").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["error"], "Failed to render page");

    let stored = app.pages.get(3).expect("page 3");
    assert!(stored.cache.is_none());
    assert!(stored.embeds.is_none());
    Ok(())
}

#[tokio::test]
async fn acl_storage_failure_denies_access() -> Result<()> {
    let app = TestApp::with_acl_store(Arc::new(FailingAclStore));
    seed(&app);

    let res = app.get("/members").await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);

    // Pages without an ACL never touch the ACL table
    let res = app.get("/").await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn debug_page_cache_in_development() -> Result<()> {
    let app = TestApp::new();
    seed(&app);
    app.get("/").await?;

    let res = app.get("/api/debug/page-cache?path=index").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["path"], "index");
    assert_eq!(res.body["cache"], "<h1>Page 1</h1><!--vps:embed:gallery:12-->");
    assert_eq!(res.body["embeds"][0]["galleryId"], 12);
    assert!(res.body["embedsRaw"].as_str().is_some());

    let res = app.get("/api/debug/page-cache?path=broken").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["cache"], json!(null));
    assert_eq!(res.body["embedsRaw"], json!(null));
    Ok(())
}

#[tokio::test]
async fn debug_routes_are_absent_in_production() -> Result<()> {
    let app = TestApp::in_environment(Environment::Production);
    seed(&app);

    let res = app.get("/api/debug/page-cache?path=index").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
