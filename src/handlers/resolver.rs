// handlers/resolver.rs - Fallback that serves pages by request path
//
// Anything the route table does not match lands here. API and health paths
// never resolve to pages.

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::info;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::handlers::pages::render_page;
use crate::state::AppState;

/// Page path for a request path: `/` is `index`, otherwise the leading slash
/// is dropped. `None` for paths that can never be pages.
pub fn page_path(request_path: &str) -> Option<String> {
    if request_path.starts_with("/api") || request_path.starts_with("/health") {
        return None;
    }

    let path = if request_path.is_empty() || request_path == "/" {
        "index"
    } else {
        request_path.trim_start_matches('/')
    };

    if path.starts_with("api") || path.starts_with("file") {
        return None;
    }
    Some(path.to_string())
}

pub async fn resolve_page(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    uri: Uri,
) -> Response {
    let Some(path) = page_path(uri.path()) else {
        return ApiError::not_found("Not found").into_response();
    };

    info!("Resolving page for path: {}", path);
    let claims = claims.map(|Extension(c)| c);
    match render_page(&state, &path, claims.as_ref()).await {
        Ok(Some(payload)) => Json(payload).into_response(),
        Ok(None) => ApiError::not_found("Not found").into_response(),
        Err(e) => e.into_response(),
    }
}
