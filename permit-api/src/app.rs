/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use permit_api::{app::{build_router, AppState}, config::Config};
/// use permit_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use permit_shared::{
    auth::{
        gate::{access_gate, GateConfig},
        password::MigratingVerifier,
    },
    services::{AuthService, MenuService, RoleService, UserService},
    store::EntityStore,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is an `Arc` or wraps one, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,

    /// Application configuration
    pub config: Arc<Config>,

    pub auth: AuthService,
    pub users: UserService,
    pub roles: RoleService,
    pub menus: MenuService,
}

impl AppState {
    /// Wires the services over `store` according to `config`
    pub fn new(store: Arc<dyn EntityStore>, config: Config) -> Self {
        let verifier = MigratingVerifier::new(config.auth.allow_legacy_cleartext);

        Self {
            auth: AuthService::new(store.clone(), verifier, config.jwt.secret.as_str()),
            users: UserService::new(store.clone()),
            roles: RoleService::with_superuser_role(store.clone(), config.auth.superuser_role.clone()),
            menus: MenuService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_permissive() {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                     # public
/// ├── /user/
/// │   ├── POST /login/                 # public
/// │   ├── POST /refresh                # public
/// │   ├── GET  /info
/// │   ├── POST /search | /save | /delete | /resetPassword | /status
/// │   ├── GET  /getUserRoles?userId=
/// │   └── POST /assignRoles
/// ├── /role/
/// │   ├── GET  /searchAllRole/
/// │   ├── POST /search | /save | /delete
/// │   ├── GET  /getRoleMenus?roleId=
/// │   └── POST /assignPermission
/// ├── /menu/
/// │   ├── GET  /searchAllMenu/ | /search | /nav
/// │   └── POST /save | /delete
/// └── GET  /media/*                    # public, static files
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. Access gate (everything outside the allow-list needs an access token)
/// 2. Logging (tower-http TraceLayer)
/// 3. Compression
/// 4. CORS (tower-http CorsLayer), so preflights never hit the gate
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/login/", post(routes::user::login))
        .route("/refresh", post(routes::user::refresh))
        .route("/info", get(routes::user::info))
        .route("/search", post(routes::user::search))
        .route("/save", post(routes::user::save))
        .route("/delete", post(routes::user::delete))
        .route("/resetPassword", post(routes::user::reset_password))
        .route("/status", post(routes::user::set_status))
        .route("/getUserRoles", get(routes::user::get_user_roles))
        .route("/assignRoles", post(routes::user::assign_roles));

    let role_routes = Router::new()
        .route("/searchAllRole/", get(routes::role::search_all))
        .route("/search", post(routes::role::search))
        .route("/save", post(routes::role::save))
        .route("/delete", post(routes::role::delete))
        .route("/getRoleMenus", get(routes::role::get_role_menus))
        .route("/assignPermission", post(routes::role::assign_permission));

    let menu_routes = Router::new()
        .route("/searchAllMenu/", get(routes::menu::search_all))
        .route("/search", get(routes::menu::search))
        .route("/nav", get(routes::menu::nav))
        .route("/save", post(routes::menu::save))
        .route("/delete", post(routes::menu::delete));

    let gate = GateConfig::new(state.jwt_secret());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/user", user_routes)
        .nest("/role", role_routes)
        .nest("/menu", menu_routes)
        .nest_service("/media", ServeDir::new(&state.config.api.media_dir))
        .layer(from_fn_with_state(gate, access_gate))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
