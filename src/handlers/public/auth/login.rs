// handlers/public/auth/login.rs - POST /api/login handler

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::auth::cookies::auth_cookie;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/login - Verify credentials and start a session
///
/// Input: `{"username": "...", "password": "..."}`; missing fields count as empty.
/// Success: `{"token": "..."}` plus the `jwt` cookie. Failure: 401 `{"error": "Invalid credentials"}`.
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();

    let result = state
        .auth
        .authenticate(&request.username, &request.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let cookie = auth_cookie(&result.token, state.sessions.cookie_settings());
    Ok((jar.add(cookie), Json(json!({ "token": result.token }))))
}
