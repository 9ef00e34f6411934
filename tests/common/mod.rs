#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use vempain_website::build_router;
use vempain_website::config::{
    AppConfig, DatabaseConfig, Environment, RenderConfig, SecurityConfig,
};
use vempain_website::database::AclStore;
use vempain_website::state::{AppState, Stores};
use vempain_website::testing::{
    test_auth_config, FixedClock, MemoryAclStore, MemoryPageStore, MemoryTokenStore,
    MemoryUserStore, TEST_EPOCH,
};

/// Full router over in-memory stores and a clock the test controls
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub tokens: Arc<MemoryTokenStore>,
    pub acls: Arc<MemoryAclStore>,
    pub pages: Arc<MemoryPageStore>,
    pub users: Arc<MemoryUserStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `Set-Cookie` header for the session cookie, if any
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("jwt="))
            .map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.headers
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

fn app_config(environment: Environment) -> AppConfig {
    AppConfig {
        environment,
        database: DatabaseConfig {
            max_connections: 1,
            connection_timeout: 1,
        },
        security: SecurityConfig {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
        },
        auth: test_auth_config(),
        render: RenderConfig::default(),
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Environment::Development, None)
    }

    pub fn in_environment(environment: Environment) -> Self {
        Self::build(environment, None)
    }

    /// Use `acls` for access checks instead of the in-memory ACL table
    pub fn with_acl_store(acls: Arc<dyn AclStore>) -> Self {
        Self::build(Environment::Development, Some(acls))
    }

    fn build(environment: Environment, acl_override: Option<Arc<dyn AclStore>>) -> Self {
        let config = app_config(environment);
        let clock = Arc::new(FixedClock::at(TEST_EPOCH));
        let tokens = Arc::new(MemoryTokenStore::default());
        let acls = Arc::new(MemoryAclStore::default());
        let pages = Arc::new(MemoryPageStore::default());
        let users = Arc::new(MemoryUserStore::default());

        let stores = Stores {
            tokens: tokens.clone(),
            acls: acl_override.unwrap_or_else(|| acls.clone() as Arc<dyn AclStore>),
            pages: pages.clone(),
            users: users.clone(),
        };

        let state = AppState::new(&config, stores, clock.clone());
        let router = build_router(state.clone(), &config.security);

        Self {
            router,
            state,
            clock,
            tokens,
            acls,
            pages,
            users,
        }
    }

    /// Issue and record a session token exactly as login would
    pub async fn token_for(&self, user_id: i64, username: &str, global_permission: bool) -> Result<String> {
        Ok(self
            .state
            .sessions
            .issue_token(user_id, username, global_permission)
            .await?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::get(uri).body(Body::empty())?).await
    }

    pub async fn get_with_bearer(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn get_with_cookie(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let request = Request::get(uri)
            .header(header::COOKIE, format!("jwt={}", token))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Result<TestResponse> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }
}
