#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use sitebook_api::{
    auth::{AuthConfig, AuthService, Role},
    config::AppConfig,
    db, app_router, AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "sitebook_test_secret_key_used_only_by_the_integration_suite_q8Zr4Lw9Xk";

/// Configuration shared by every harness; the database URL is filled in per app.
pub fn test_config(database_url: String) -> AppConfig {
    let mut cfg = AppConfig::new(
        database_url,
        TEST_JWT_SECRET.to_string(),
        3600,
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

/// Helper harness around the full application router.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_id: Uuid,
    admin_token: String,
    _db_dir: Option<TempDir>,
}

impl TestApp {
    /// Application backed by a migrated SQLite file in a temp directory.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestApp::new`], letting the test adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let app = Self::open(adjust).await;
        db::run_migrations(&app.state.db)
            .await
            .expect("failed to run migrations in tests");
        app
    }

    /// Application on a reachable SQLite file that was never migrated. Every
    /// query fails with a real backend error ("no such table"), so routing,
    /// auth and input validation are observable along with the 500 path.
    pub async fn unmigrated() -> Self {
        Self::open(|_| {}).await
    }

    /// Application whose connection was never opened. Only `ping` may be
    /// used against it: it reports the error, while queries would panic.
    pub fn disconnected() -> Self {
        let cfg = test_config("sqlite::memory:".to_string());
        Self::from_parts(Arc::new(DatabaseConnection::default()), cfg, None)
    }

    async fn open(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("sitebook_test.db");
        let mut cfg = test_config(format!("sqlite://{}?mode=rwc", path.display()));
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        Self::from_parts(Arc::new(pool), cfg, Some(dir))
    }

    fn from_parts(db: Arc<DatabaseConnection>, cfg: AppConfig, dir: Option<TempDir>) -> Self {
        let state = AppState::new(db, cfg);
        let admin_id = Uuid::new_v4();
        let admin_token = state
            .auth
            .generate_token(admin_id, "Head Office", Role::Admin)
            .expect("issue admin token")
            .access_token;

        Self {
            router: app_router(state.clone()),
            state,
            admin_id,
            admin_token,
            _db_dir: dir,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Token for a supervisor with the given user id.
    pub fn supervisor_token(&self, user_id: Uuid) -> String {
        self.state
            .auth
            .generate_token(user_id, "Site Supervisor", Role::Supervisor)
            .expect("issue supervisor token")
            .access_token
    }

    /// A service configured like the app's but with a different secret,
    /// for producing tokens the app must reject.
    pub fn foreign_auth_service(&self) -> AuthService {
        let cfg = &self.state.config;
        AuthService::new(AuthConfig::new(
            format!("{}-other", cfg.jwt_secret),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            std::time::Duration::from_secs(600),
        ))
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router request failed")
    }

    /// Sends a raw body with a JSON content type.
    pub async fn request_raw(&self, method: Method, uri: &str, raw: &str, token: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(Body::from(raw.to_string()))
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router request failed")
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
