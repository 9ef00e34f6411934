// handlers/debug.rs - GET /api/debug/page-cache handler (development only)

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::public::page_content::PageContentQuery;
use crate::state::AppState;

/// GET /api/debug/page-cache?path=<path> - The stored cache/embeds pair of a page
pub async fn page_cache_get(
    State(state): State<AppState>,
    Query(query): Query<PageContentQuery>,
) -> Result<Json<Value>, ApiError> {
    let path = query.path.unwrap_or_default();
    if path.is_empty() {
        return Err(ApiError::bad_request("Missing path"));
    }

    let page = state
        .pages
        .find_by_path(&path)
        .await?
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    Ok(Json(json!({
        "path": page.path,
        "cache": page.cache,
        "embeds": page.embeds(),
        "embedsRaw": page.embeds,
    })))
}
