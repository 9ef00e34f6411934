use std::sync::Arc;

use tracing::debug;

use super::is_public;
use crate::auth::{Clock, Claims};
use crate::database::{AclStore, DatabaseError, TokenStore};

/// Decides whether a principal may reach a resource guarded by an ACL id.
///
/// Storage failures are returned to the caller; nothing here grants access
/// on an error.
#[derive(Clone)]
pub struct AccessControlEngine {
    acls: Arc<dyn AclStore>,
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl AccessControlEngine {
    pub fn new(acls: Arc<dyn AclStore>, tokens: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { acls, tokens, clock }
    }

    /// True iff at least one membership row exists for `acl_id`
    pub async fn acl_requires_auth(&self, acl_id: i64) -> Result<bool, DatabaseError> {
        self.acls.acl_requires_auth(acl_id).await
    }

    pub async fn can_access(
        &self,
        acl_id: Option<i64>,
        claims: Option<&Claims>,
    ) -> Result<bool, DatabaseError> {
        let acl_id = match acl_id {
            Some(id) if !is_public(Some(id)) => id,
            _ => return Ok(true),
        };

        if !self.acl_requires_auth(acl_id).await? {
            debug!("ACL {} has no members, treating as public", acl_id);
            return Ok(true);
        }

        let Some(claims) = claims else {
            return Ok(false);
        };
        if claims.token.is_empty() || claims.sub <= 0 {
            return Ok(false);
        }

        // The bearer token must still be a live session of the same user
        let record = self
            .tokens
            .find_valid_token(&claims.token, self.clock.now())
            .await?;
        match record {
            Some(record) if record.user_id == claims.sub => {}
            _ => {
                debug!("No live session for user {} on ACL {}", claims.sub, acl_id);
                return Ok(false);
            }
        }

        self.acls.user_has_access(acl_id, claims.sub).await
    }
}
