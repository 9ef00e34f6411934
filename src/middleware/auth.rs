use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Claims;
use crate::error::ApiError;

/// Reject requests the session middleware did not authenticate
pub async fn require_auth(request: Request, next: Next) -> Response {
    if request.extensions().get::<Claims>().is_none() {
        return ApiError::unauthorized("Unauthorized").into_response();
    }
    next.run(request).await
}
