use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::{AuthSessionManager, SessionEffect};
use crate::error::ApiError;
use crate::state::AppState;

/// Session pipeline for every request except login/logout.
///
/// Attaches [`crate::auth::Claims`] as a request extension when the token is
/// valid and sends the refreshed token back. Expired tokens end the request
/// with 401 and a cleared cookie; any other bad token is simply ignored.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if AuthSessionManager::is_exempt(&path) {
        debug!("Session pipeline skipped for {}", path);
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (claims, effect) = match state
        .sessions
        .process_inbound(auth_header.as_deref(), &jar)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if effect == SessionEffect::Expired {
        let mut response = ApiError::SessionExpired.into_response();
        effect.apply(response.headers_mut(), state.sessions.cookie_settings());
        return response;
    }

    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }

    let mut response = next.run(request).await;
    effect.apply(response.headers_mut(), state.sessions.cookie_settings());
    response
}
