// handlers/pages.rs - Shared page lookup, gating and rendering

use serde::Serialize;
use tracing::info;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::render::Embed;
use crate::state::AppState;

/// Page as the SPA consumes it
#[derive(Debug, Clone, Serialize)]
pub struct PagePayload {
    pub body: String,
    pub header: String,
    pub title: String,
    pub creator: String,
    pub published: Option<String>,
    pub embeds: Vec<Embed>,
}

/// Look up, gate and render the page at `path`.
///
/// `Ok(None)` when no page has that path. The ACL check runs before the
/// cache is consulted, on every request.
pub async fn render_page(
    state: &AppState,
    path: &str,
    claims: Option<&Claims>,
) -> Result<Option<PagePayload>, ApiError> {
    let Some(mut page) = state.pages.find_by_path(path).await? else {
        info!("No page at path: {}", path);
        return Ok(None);
    };

    if let Some(denial) = state.gate.get_denied_status(page.acl_id, claims).await? {
        info!("Page {} denied: {:?}", page.id, denial);
        return Err(denial.into());
    }

    let body = state
        .pipeline
        .render(&mut page)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Failed to render page"))?;

    Ok(Some(PagePayload {
        body,
        header: page.header.clone(),
        title: page.title.clone(),
        creator: page.creator.clone(),
        published: page.published.map(|p| p.to_rfc3339()),
        embeds: page.embeds(),
    }))
}
