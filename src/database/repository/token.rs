use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::TokenStore;
use crate::database::manager::DatabaseError;
use crate::database::models::TokenRecord;

/// Issuer recorded on every token row
const SYSTEM_CREATOR: i64 = 1;

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        created: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO web_site_jwt_token (user_id, token, creator, created, expires) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(token)
        .bind(SYSTEM_CREATOR)
        .bind(created)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT id, user_id, token, creator, created, expires \
             FROM web_site_jwt_token WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.filter(|r| r.is_valid_at(now)))
    }
}
