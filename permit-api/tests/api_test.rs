/// End-to-end tests for the HTTP surface
///
/// Each test builds the router over its own in-memory store and drives it
/// with `oneshot` requests.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, ADMIN, PASSWORD, SECRET};
use permit_shared::auth::jwt::{create_token, Claims, TokenType};
use serde_json::{json, Value};

fn names(nodes: &Value) -> Vec<String> {
    nodes
        .as_array()
        .expect("array of nodes")
        .iter()
        .map(|n| n["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

// Gate

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

#[tokio::test]
async fn test_media_is_public() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/media/hello.txt", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("hello from media\n".to_string()));
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_access_token() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/user/info", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    // Blank bearer value counts as no token
    let (status, body) = ctx.send(Method::GET, "/user/info", None, Some("")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, body) = ctx.send(Method::GET, "/media-admin", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, body) = ctx.send(Method::GET, "/user/info", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let expired = Claims::with_expiration(
        ctx.bootstrap.user_id,
        ADMIN,
        TokenType::Access,
        chrono::Duration::seconds(-60),
    );
    let expired = create_token(&expired, SECRET).unwrap();
    let (status, body) = ctx.send(Method::GET, "/user/info", None, Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");

    let refresh = create_token(
        &Claims::new(ctx.bootstrap.user_id, ADMIN, TokenType::Refresh),
        SECRET,
    )
    .unwrap();
    let (status, body) = ctx.send(Method::GET, "/user/info", None, Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let ctx = TestContext::new().await;

    let response = {
        use tower::ServiceExt;
        let request = axum::http::Request::builder()
            .uri("/user/info")
            .body(axum::body::Body::empty())
            .unwrap();
        ctx.app.clone().oneshot(request).await.unwrap()
    };

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
}

// Login

#[tokio::test]
async fn test_login_returns_tokens_roles_and_menus() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.login(ADMIN, PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["roles"], json!(["admin"]));
    assert_eq!(body["user"]["username"], ADMIN);
    assert!(body["user"].get("credential").is_none());
    assert!(body["menus"].is_array());

    let token = body["access_token"].as_str().unwrap();
    let (status, info) = ctx.send(Method::GET, "/user/info", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["user"]["id"], ctx.bootstrap.user_id);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new().await;

    let (unknown_status, unknown) = ctx.login("nobody", PASSWORD).await;
    let (wrong_status, wrong) = ctx.login(ADMIN, "Wrong#pass1").await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);

    let (status, body) = ctx.login("", "").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let ctx = TestContext::new().await;
    let (_, login) = ctx.login(ADMIN, PASSWORD).await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/user/refresh",
            Some(json!({ "refresh_token": login["refresh_token"] })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let access = body["access_token"].as_str().unwrap();
    let (status, _) = ctx.send(Method::GET, "/menu/nav", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted for refresh
    let (status, _) = ctx
        .send(
            Method::POST,
            "/user/refresh",
            Some(json!({ "refresh_token": login["access_token"] })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// Menus

#[tokio::test]
async fn test_menu_tree_orders_children_and_keeps_empty_children() {
    let ctx = TestContext::new().await;
    let system = ctx.create_menu("System", Some(0), Some(1)).await;
    ctx.create_menu("Role", Some(system), Some(2)).await;
    ctx.create_menu("User", Some(system), Some(1)).await;
    ctx.create_menu("Help", None, None).await;

    let (status, tree) = ctx.get("/menu/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&tree), vec!["System", "Help"]);
    assert_eq!(names(&tree[0]["children"]), vec!["User", "Role"]);
    assert_eq!(tree[0]["children"][0]["children"], json!([]));
    assert_eq!(tree[0]["parent_id"], Value::Null);

    let (status, flat) = ctx.get("/menu/searchAllMenu/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&flat), vec!["System", "User", "Role", "Help"]);
}

#[tokio::test]
async fn test_menu_guards() {
    let ctx = TestContext::new().await;
    let parent = ctx.create_menu("Parent", None, None).await;
    let child = ctx.create_menu("Child", Some(parent), None).await;

    let (status, _) = ctx.post("/menu/delete", json!({ "id": parent })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .post("/menu/save", json!({ "id": parent, "name": "Parent", "parent_id": child }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx.post("/menu/save", json!({ "name": "Parent" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx.post("/menu/save", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "name");

    let (status, _) = ctx.post("/menu/delete", json!({ "id": child })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.post("/menu/delete", json!({ "id": parent })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_nav_shows_only_granted_menus() {
    let ctx = TestContext::new().await;
    let system = ctx.create_menu("System", None, Some(1)).await;
    let users = ctx.create_menu("Users", Some(system), Some(1)).await;
    let roles = ctx.create_menu("Roles", Some(system), Some(2)).await;
    let audit = ctx.create_menu("Audit", None, Some(2)).await;

    let editor = ctx.create_role("Editor", "editor").await;
    let viewer = ctx.create_role("Viewer", "viewer").await;
    let (status, _) = ctx
        .post("/role/assignPermission", json!({ "role_id": editor, "menu_ids": [system, users] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx
        .post("/role/assignPermission", json!({ "role_id": viewer, "menu_ids": [users, audit] }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let alice = ctx.create_user("alice").await;
    let (status, _) = ctx
        .post("/user/assignRoles", json!({ "user_id": alice, "role_ids": [editor, viewer] }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, login) = ctx.login("alice", PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "{login}");
    assert_eq!(login["roles"], json!(["editor", "viewer"]));

    let token = login["access_token"].as_str().unwrap();
    let (status, nav) = ctx.send(Method::GET, "/menu/nav", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&nav), vec!["System", "Audit"]);
    assert_eq!(names(&nav[0]["children"]), vec!["Users"]);
    assert_ne!(nav[0]["children"][0]["id"], roles);
}

// Roles

#[tokio::test]
async fn test_superuser_role_survives_delete() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post("/role/delete", json!({ "id": ctx.bootstrap.role_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, roles) = ctx.get("/role/searchAllRole/").await;
    assert_eq!(roles.as_array().unwrap().len(), 1);

    let (_, role_ids) = ctx
        .get(&format!("/user/getUserRoles?userId={}", ctx.bootstrap.user_id))
        .await;
    assert_eq!(role_ids, json!([ctx.bootstrap.role_id]));
}

#[tokio::test]
async fn test_role_crud() {
    let ctx = TestContext::new().await;
    let ops = ctx.create_role("Ops", "ops").await;

    let (status, _) = ctx.post("/role/save", json!({ "name": "Ops", "code": "other" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .post("/role/save", json!({ "id": ops, "name": "Operations", "code": "ops" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Operations");

    let (status, page) = ctx
        .post("/role/search", json!({ "query": "OPER", "page_num": 1, "page_size": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], ops);

    let (status, _) = ctx.post("/role/delete", json!({ "id": ops })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.get(&format!("/role/getRoleMenus?roleId={ops}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// Users

#[tokio::test]
async fn test_assign_unknown_role_clears_set_and_reports_skip() {
    let ctx = TestContext::new().await;
    let a = ctx.create_role("A", "a").await;
    let b = ctx.create_role("B", "b").await;
    let user = ctx.create_user("u").await;
    ctx.post("/user/assignRoles", json!({ "user_id": user, "role_ids": [a, b] }))
        .await;

    let (status, report) = ctx
        .post("/user/assignRoles", json!({ "user_id": user, "role_ids": [9999] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({ "assigned": [], "skipped": [9999] }));

    let (_, role_ids) = ctx.get(&format!("/user/getUserRoles?userId={user}")).await;
    assert_eq!(role_ids, json!([]));
}

#[tokio::test]
async fn test_user_admin_flow() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post("/user/save", json!({ "username": "bob", "password": "weak" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = ctx
        .post("/user/save", json!({ "username": "bob", "email": "not-an-email", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let bob = ctx.create_user("bob").await;
    let (status, _) = ctx
        .post("/user/save", json!({ "username": "bob", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = ctx
        .post("/user/save", json!({ "id": bob, "remark": "night shift", "status": "disabled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["remark"], "night shift");
    assert_eq!(updated["status"], "disabled");

    let (status, _) = ctx.login("bob", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.post("/user/status", json!({ "id": bob, "status": "enabled" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx
        .post("/user/resetPassword", json!({ "id": bob, "password": "N3w#secret" }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.login("bob", "N3w#secret").await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = ctx.post("/user/search", json!({ "query": "BO" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = ctx.post("/user/delete", json!({ "id": bob })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_cannot_delete_or_disable_self() {
    let ctx = TestContext::new().await;
    let me = ctx.bootstrap.user_id;

    let (status, _) = ctx.post("/user/delete", json!({ "id": me })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx.post("/user/status", json!({ "id": me, "status": "disabled" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .post(
            "/user/save",
            json!({ "id": me, "email": "changed@example.com", "status": "disabled" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stored = ctx.store.find_user(me).await.unwrap().unwrap();
    assert_eq!(stored.email, None);
}

#[tokio::test]
async fn test_legacy_cleartext_login_when_enabled() {
    use permit_shared::models::user::{CreateUser, UserProfile, UserStatus};

    let ctx = TestContext::with_vars(&[("AUTH_ALLOW_LEGACY_CLEARTEXT", "true")]).await;
    let legacy = ctx
        .store
        .insert_user(CreateUser {
            username: "legacy".into(),
            credential: "123456".into(),
            status: UserStatus::Enabled,
            profile: UserProfile::default(),
        })
        .await
        .unwrap();

    let (status, _) = ctx.login("legacy", "123456").await;
    assert_eq!(status, StatusCode::OK);

    let stored = ctx.store.find_user(legacy.id).await.unwrap().unwrap();
    assert!(stored.credential.starts_with("$argon2"));
}
