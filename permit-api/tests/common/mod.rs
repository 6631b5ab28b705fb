// Common test utilities for the API integration tests
//
// The router runs over a fresh `MemoryStore` with a bootstrapped superuser,
// so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use permit_api::app::{build_router, AppState};
use permit_api::config::Config;
use permit_shared::auth::jwt::{create_token, Claims, TokenType};
use permit_shared::models::role::SUPERUSER_ROLE_NAME;
use permit_shared::services::bootstrap::{ensure_superuser, BootstrapReport};
use permit_shared::store::{EntityStore, MemoryStore};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "api-test-secret-key-at-least-32-bytes";
pub const ADMIN: &str = "admin";
pub const PASSWORD: &str = "Adm1n@pass";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<dyn EntityStore>,
    pub app: Router,
    pub bootstrap: BootstrapReport,
    pub token: String,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_vars(&[]).await
    }

    /// Builds the app with extra configuration variables
    pub async fn with_vars(extra: &[(&str, &str)]) -> Self {
        let media_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/media");
        let mut vars: Vec<(&str, &str)> = vec![
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", SECRET),
            ("MEDIA_DIR", media_dir),
        ];
        vars.extend_from_slice(extra);

        let config = Config::from_lookup(|name| {
            vars.iter()
                .rev()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
        .expect("test config");

        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
        let bootstrap = ensure_superuser(&store, SUPERUSER_ROLE_NAME, ADMIN, PASSWORD)
            .await
            .expect("bootstrap");

        let claims = Claims::new(bootstrap.user_id, ADMIN, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("token");

        let app = build_router(AppState::new(store.clone(), config));

        Self {
            store,
            app,
            bootstrap,
            token,
        }
    }

    /// Sends a request and returns the status and the JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// GET as the bootstrapped admin
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, Some(&self.token)).await
    }

    /// POST as the bootstrapped admin
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), Some(&self.token)).await
    }

    /// Creates a menu through the API and returns its id
    pub async fn create_menu(&self, name: &str, parent_id: Option<i64>, order_num: Option<i32>) -> i64 {
        let (status, json) = self
            .post(
                "/menu/save",
                serde_json::json!({ "name": name, "parent_id": parent_id, "order_num": order_num }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create menu {name}: {json}");
        json["id"].as_i64().expect("menu id")
    }

    /// Creates a role through the API and returns its id
    pub async fn create_role(&self, name: &str, code: &str) -> i64 {
        let (status, json) = self
            .post("/role/save", serde_json::json!({ "name": name, "code": code }))
            .await;
        assert_eq!(status, StatusCode::OK, "create role {name}: {json}");
        json["id"].as_i64().expect("role id")
    }

    /// Creates a user through the API and returns its id
    pub async fn create_user(&self, username: &str) -> i64 {
        let (status, json) = self
            .post(
                "/user/save",
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user {username}: {json}");
        json["id"].as_i64().expect("user id")
    }

    /// Logs in through the API and returns the full response body
    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/user/login/",
            Some(serde_json::json!({ "username": username, "password": password })),
            None,
        )
        .await
    }
}
