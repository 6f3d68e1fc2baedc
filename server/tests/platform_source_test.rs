//! Platform API Client Tests
//!
//! Runs `HttpPrivilegeSource` against a fake platform API on a real socket
//! and checks that context loading decodes rows, profiles and board clubs,
//! and fails closed on HTTP errors.
//!
//! Run with: `cargo test --test platform_source_test`

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use campus_gate::permissions::{
    load_auth_context, try_load_auth_context, AuthContextCache, HttpPrivilegeSource,
    PermissionType, PrivilegeSource, SourceError, UserRole,
};
use helpers::{fake_platform_api, spawn_test_server, Fixtures, TestServer};

fn platform_fixtures() -> Fixtures {
    Fixtures::new()
        .profile("u1", json!({ "_id": "u1", "userRole": "member" }))
        .rows(
            "u1",
            vec![
                json!({
                    "user_id": { "_id": "u1", "userRole": "member" },
                    "club_id": { "_id": "c1", "name": "Robotics", "description": "Builds robots" },
                    "privilegeTypeId": { "posts": true, "events": "yes" }
                }),
                json!({ "club_id": "c1", "privilegeTypeId": { "forums": 1 } }),
                json!({ "board_id": "b1", "privilegeTypeId": { "blogs": true } }),
                json!({ "club_id": "c2", "board_id": "b1", "privilegeTypeId": { "posts": true } }),
                json!("not a row"),
            ],
        )
        .profile(
            "ba",
            json!({ "_id": "ba", "userRole": "board_admin", "boardId": { "_id": "b1" } }),
        )
        .board_clubs(
            "b1",
            vec![
                json!({ "_id": "c1", "name": "Robotics" }),
                json!({ "_id": "c2", "name": "Chess" }),
            ],
        )
        .profile("ca", json!({ "_id": "ca", "userRole": "club_admin", "club_id": "c7" }))
}

async fn platform() -> (TestServer, HttpPrivilegeSource) {
    let server = spawn_test_server(fake_platform_api(platform_fixtures())).await;
    let source = HttpPrivilegeSource::new(&format!("{}/api/", server.url), Duration::from_secs(5))
        .expect("Failed to build client");
    (server, source)
}

#[tokio::test]
async fn test_fetches_raw_rows_and_profile() {
    let (_server, source) = platform().await;

    let rows = source.fetch_privileges("u1").await.unwrap();
    assert_eq!(rows.len(), 5);

    let profile = source.fetch_profile("ba").await.unwrap();
    assert_eq!(profile.user_role, Some(UserRole::BoardAdmin));
    assert_eq!(profile.board_id(), Some("b1"));

    let clubs = source.fetch_board_clubs("b1").await.unwrap();
    assert_eq!(clubs, vec!["c1", "c2"]);

    assert!(source.fetch_board_clubs("b9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_member_context_from_platform() {
    let (_server, source) = platform().await;

    let ctx = try_load_auth_context(&source, "u1").await.unwrap();
    assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    assert_eq!(ctx.user_role, Some(UserRole::Member));
    assert!(!ctx.is_super_admin && !ctx.is_board_admin && !ctx.is_club_admin);

    let robotics = &ctx.data.clubs["c1"];
    assert_eq!(robotics.name, "Robotics");
    assert_eq!(robotics.description, "Builds robots");

    assert!(ctx.can(PermissionType::Posts, None, Some("c1")));
    assert!(ctx.can(PermissionType::Events, None, Some("c1")));
    assert!(ctx.can(PermissionType::Forums, None, Some("c1")));
    assert!(!ctx.can(PermissionType::Projects, None, Some("c1")));
    assert!(ctx.can(PermissionType::Blogs, Some("b1"), None));

    // The row naming both a club and a board was rejected
    assert!(!ctx.data.clubs.contains_key("c2"));
    assert!(!ctx.can(PermissionType::Posts, None, Some("c2")));
}

#[tokio::test]
async fn test_board_admin_context_resolves_child_clubs() {
    let (_server, source) = platform().await;

    let ctx = load_auth_context(&source, "ba").await;
    assert!(ctx.is_board_admin);
    assert_eq!(ctx.board_id.as_deref(), Some("b1"));
    assert_eq!(ctx.club_array, vec!["c1", "c2"]);

    assert!(ctx.can(PermissionType::Events, Some("b1"), None));
    assert!(ctx.can(PermissionType::Events, Some("b1"), Some("c2")));
    assert!(!ctx.can(PermissionType::Events, Some("b1"), Some("c3")));
}

#[tokio::test]
async fn test_club_admin_context_is_scoped() {
    let (_server, source) = platform().await;

    let ctx = load_auth_context(&source, "ca").await;
    assert!(ctx.is_club_admin);
    assert!(ctx.club_array.is_empty());
    assert!(ctx.can(PermissionType::Resources, None, Some("c7")));
    assert!(!ctx.can(PermissionType::Resources, None, Some("c1")));
}

#[tokio::test]
async fn test_http_errors_surface_status() {
    let (_server, source) = platform().await;

    match source.fetch_profile("nobody").await {
        Err(SourceError::Status { status, url }) => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/api/users/nobody"));
        }
        other => panic!("expected 404 status error, got {other:?}"),
    }

    match source.fetch_privileges("broken").await {
        Err(SourceError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected 500 status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_errors_fail_closed() {
    let (_server, source) = platform().await;

    for user_id in ["nobody", "broken"] {
        let ctx = load_auth_context(&source, user_id).await;
        assert_eq!(ctx.user_id.as_deref(), Some(user_id));
        assert!(ctx.is_unprivileged(), "{user_id} should be unprivileged");
    }
}

#[tokio::test]
async fn test_cache_over_http_source() {
    let (_server, source) = platform().await;
    let source: Arc<dyn PrivilegeSource> = Arc::new(source);
    let cache = AuthContextCache::new();

    let first = cache.get_or_load(source.as_ref(), "u1").await;
    let second = cache.get_or_load(source.as_ref(), "u1").await;
    assert!(Arc::ptr_eq(&first, &second));

    let failed = cache.get_or_load(source.as_ref(), "broken").await;
    assert!(failed.is_unprivileged());
    assert!(cache.get("broken").is_none());
    assert_eq!(cache.len(), 1);
}
