// handlers/public/page_content.rs - GET /api/public/page-content handler

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::handlers::pages::{render_page, PagePayload};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageContentQuery {
    pub path: Option<String>,
}

/// GET /api/public/page-content?path=<path> - Rendered page addressed by path
///
/// 400 without a path, 404 for an unknown one, 401/403 when the page's ACL refuses.
pub async fn page_content_get(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Query(query): Query<PageContentQuery>,
) -> Result<Json<PagePayload>, ApiError> {
    let path = query.path.unwrap_or_default();
    if path.is_empty() {
        return Err(ApiError::bad_request("Missing path"));
    }

    let claims = claims.map(|Extension(c)| c);
    render_page(&state, &path, claims.as_ref())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Page not found"))
}
