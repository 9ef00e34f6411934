// handlers/public/auth/logout.rs - POST /api/logout handler

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::auth::cookies::cleared_auth_cookie;
use crate::state::AppState;

/// POST /api/logout - Clear the session cookie
///
/// Stored token rows are left to expire on their own.
pub async fn logout_post(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = cleared_auth_cookie(state.sessions.cookie_settings());
    (jar.add(cookie), Json(json!({ "status": "ok" })))
}
