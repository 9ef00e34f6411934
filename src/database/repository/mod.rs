//! Storage collaborators consumed by the session, access-control and
//! rendering components. Each trait has a Postgres implementation here and
//! an in-memory one in `crate::testing`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::manager::DatabaseError;
use crate::database::models::{Page, TokenRecord, User};

pub mod acl;
pub mod page;
pub mod token;
pub mod user;

pub use acl::PgAclStore;
pub use page::PgPageStore;
pub use token::PgTokenStore;
pub use user::PgUserStore;

/// Issued-token persistence, used to tie a bearer token back to a user
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        created: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// The stored record for `token`, only if it expires after `now`
    async fn find_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>, DatabaseError>;
}

/// ACL membership lookups
#[async_trait]
pub trait AclStore: Send + Sync {
    /// True iff at least one membership row exists for `acl_id`
    async fn acl_requires_auth(&self, acl_id: i64) -> Result<bool, DatabaseError>;

    async fn user_has_access(&self, acl_id: i64, user_id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn find_by_path(&self, path: &str) -> Result<Option<Page>, DatabaseError>;

    async fn find_all(&self) -> Result<Vec<Page>, DatabaseError>;

    /// Write the rendered body and its embed list together
    async fn update_cache_and_embeds(
        &self,
        id: i64,
        cache: &str,
        embeds: Option<&str>,
    ) -> Result<(), DatabaseError>;

    async fn update_embeds(&self, id: i64, embeds: Option<&str>) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
}
