use async_trait::async_trait;
use sqlx::PgPool;

use super::AclStore;
use crate::database::manager::DatabaseError;

pub struct PgAclStore {
    pool: PgPool,
}

impl PgAclStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AclStore for PgAclStore {
    async fn acl_requires_auth(&self, acl_id: i64) -> Result<bool, DatabaseError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM web_site_acl WHERE acl_id = $1)")
                .bind(acl_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn user_has_access(&self, acl_id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM web_site_acl WHERE acl_id = $1 AND user_id = $2)",
        )
        .bind(acl_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }
}
