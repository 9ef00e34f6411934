pub mod acl;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use axum::{
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::cookies::REFRESH_HEADER;
use crate::config::SecurityConfig;
use crate::state::AppState;

/// Full application router: public and protected API routes, the page
/// resolver as fallback, and the session pipeline in front of all of it.
pub fn build_router(state: AppState, security: &SecurityConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/health", get(handlers::public::health_get))
        .merge(auth_public_routes())
        .route(
            "/api/public/page-content",
            get(handlers::public::page_content_get),
        )
        // Protected
        .merge(auth_routes());

    if state.debug_routes_enabled() {
        router = router.route("/api/debug/page-cache", get(handlers::debug::page_cache_get));
    }

    router
        .fallback(handlers::resolver::resolve_page)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/login", post(auth::login_post))
        .route("/api/logout", post(auth::logout_post))
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami_get))
        .route_layer(axum::middleware::from_fn(middleware::require_auth))
}

/// CORS from configuration; the refresh header must stay readable by the browser
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REFRESH_HEADER)])
}
