// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::{Extension, Json};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::auth::Claims;

/// GET /api/auth/whoami - Claims of the current session
///
/// `expiresAt` describes the token presented with this request, not the
/// refreshed one returned in `X-Auth-Token`.
pub async fn whoami_get(Extension(claims): Extension<Claims>) -> Json<Value> {
    let expires_at = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .map(|t| t.to_rfc3339());

    Json(json!({
        "userId": claims.sub,
        "username": claims.username,
        "globalPermission": claims.global_permission,
        "expiresAt": expires_at,
    }))
}
