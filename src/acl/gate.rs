use axum::http::StatusCode;

use super::engine::AccessControlEngine;
use super::is_public;
use crate::auth::Claims;
use crate::database::DatabaseError;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// No session at all: prompt for login
    Unauthorized,
    /// Signed in but not a member
    Forbidden,
}

impl AccessDenial {
    pub fn status(self) -> StatusCode {
        match self {
            AccessDenial::Unauthorized => StatusCode::UNAUTHORIZED,
            AccessDenial::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

/// Maps ACL decisions onto permit / 401 / 403
#[derive(Clone)]
pub struct ResourceAccessGate {
    engine: AccessControlEngine,
}

impl ResourceAccessGate {
    pub fn new(engine: AccessControlEngine) -> Self {
        Self { engine }
    }

    /// `Ok(None)` permits. Global permission bypasses the ACL lookup entirely.
    pub async fn get_denied_status(
        &self,
        acl_id: Option<i64>,
        claims: Option<&Claims>,
    ) -> Result<Option<AccessDenial>, DatabaseError> {
        if is_public(acl_id) {
            return Ok(None);
        }

        if claims.is_some_and(|c| c.global_permission) {
            return Ok(None);
        }

        if self.engine.can_access(acl_id, claims).await? {
            return Ok(None);
        }

        Ok(Some(match claims {
            None => AccessDenial::Unauthorized,
            Some(_) => AccessDenial::Forbidden,
        }))
    }
}
