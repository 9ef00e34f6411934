//! In-memory collaborators and fixtures for unit and integration tests.
//!
//! Every store mirrors the semantics of its Postgres counterpart closely
//! enough for the session, ACL and render components to be exercised
//! without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::auth::{Claims, Clock};
use crate::config::{AuthConfig, SecretSource};
use crate::database::models::{AclEntry, Page, TokenRecord, User};
use crate::database::{AclStore, DatabaseError, PageStore, TokenStore, UserStore};

/// Secret used by [`test_auth_config`]
pub const TEST_SECRET: &str = "test-signing-secret";

/// Fixed start instant for clocks in tests (2023-11-14T22:13:20Z)
pub const TEST_EPOCH: i64 = 1_700_000_000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        secret_source: SecretSource::Explicit,
        jwt_ttl_seconds: 1200,
        cookie_secure: false,
        cookie_domain: None,
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub fn at(seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(seconds),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn timestamp(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        at(self.timestamp())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: Mutex<Vec<TokenRecord>>,
}

impl MemoryTokenStore {
    /// Seed a token row directly
    pub fn insert(&self, user_id: i64, token: &str, expires_at: i64) {
        let mut records = lock(&self.records);
        let id = records.len() as i64 + 1;
        records.push(TokenRecord {
            id,
            user_id,
            token: token.to_string(),
            creator: 1,
            created: at(expires_at - 1200),
            expires_at: at(expires_at),
        });
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tokens_for(&self, user_id: i64) -> Vec<String> {
        lock(&self.records)
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.token.clone())
            .collect()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        created: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut records = lock(&self.records);
        if records.iter().any(|r| r.token == token) {
            return Err(DatabaseError::Serialization(
                "duplicate token in web_site_jwt_token".to_string(),
            ));
        }
        let id = records.len() as i64 + 1;
        records.push(TokenRecord {
            id,
            user_id,
            token: token.to_string(),
            creator: 1,
            created,
            expires_at,
        });
        Ok(())
    }

    async fn find_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>, DatabaseError> {
        Ok(lock(&self.records)
            .iter()
            .find(|r| r.token == token)
            .filter(|r| r.is_valid_at(now))
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAclStore {
    entries: Mutex<Vec<AclEntry>>,
}

impl MemoryAclStore {
    pub fn grant(&self, acl_id: i64, user_id: i64) {
        lock(&self.entries).push(AclEntry { acl_id, user_id });
    }
}

#[async_trait]
impl AclStore for MemoryAclStore {
    async fn acl_requires_auth(&self, acl_id: i64) -> Result<bool, DatabaseError> {
        Ok(lock(&self.entries).iter().any(|e| e.acl_id == acl_id))
    }

    async fn user_has_access(&self, acl_id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        Ok(lock(&self.entries)
            .iter()
            .any(|e| e.acl_id == acl_id && e.user_id == user_id))
    }
}

/// Every lookup fails, as if the database were unreachable
#[derive(Debug, Default)]
pub struct FailingAclStore;

#[async_trait]
impl AclStore for FailingAclStore {
    async fn acl_requires_auth(&self, _acl_id: i64) -> Result<bool, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolClosed))
    }

    async fn user_has_access(&self, _acl_id: i64, _user_id: i64) -> Result<bool, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolClosed))
    }
}

#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: Mutex<HashMap<i64, Page>>,
    cache_writes: AtomicUsize,
    embed_writes: AtomicUsize,
}

impl MemoryPageStore {
    pub fn insert(&self, page: Page) {
        lock(&self.pages).insert(page.id, page);
    }

    pub fn get(&self, id: i64) -> Option<Page> {
        lock(&self.pages).get(&id).cloned()
    }

    /// Number of `update_cache_and_embeds` calls that hit a row
    pub fn cache_writes(&self) -> usize {
        self.cache_writes.load(Ordering::SeqCst)
    }

    pub fn embed_writes(&self) -> usize {
        self.embed_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<Page>, DatabaseError> {
        Ok(lock(&self.pages).values().find(|p| p.path == path).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Page>, DatabaseError> {
        let mut pages: Vec<Page> = lock(&self.pages).values().cloned().collect();
        pages.sort_by_key(|p| p.id);
        Ok(pages)
    }

    async fn update_cache_and_embeds(
        &self,
        id: i64,
        cache: &str,
        embeds: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut pages = lock(&self.pages);
        let page = pages
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("page {}", id)))?;
        page.cache = Some(cache.to_string());
        page.embeds = embeds.map(str::to_string);
        self.cache_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_embeds(&self, id: i64, embeds: Option<&str>) -> Result<(), DatabaseError> {
        let mut pages = lock(&self.pages);
        let page = pages
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("page {}", id)))?;
        page.embeds = embeds.map(str::to_string);
        self.embed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    /// Adds a user with a low-cost bcrypt hash of `password`
    pub fn add_user(&self, id: i64, username: &str, password: &str, global_permission: bool) {
        let password_hash = bcrypt::hash(password, 4).unwrap_or_default();
        lock(&self.users).push(User {
            id,
            username: username.to_string(),
            password_hash,
            global_permission,
        });
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

/// Claims as the session layer would attach them, without signing anything
pub fn claims_for(user_id: i64, token: &str) -> Claims {
    Claims {
        sub: user_id,
        username: format!("user{}", user_id),
        global_permission: false,
        iat: TEST_EPOCH,
        exp: TEST_EPOCH + 1200,
        jti: None,
        token: token.to_string(),
    }
}

/// A public, uncached page with the given body
pub fn page_fixture(id: i64, path: &str, body: &str) -> Page {
    Page {
        id,
        page_id: id,
        acl_id: None,
        body: Some(body.to_string()),
        header: format!("Header {}", id),
        title: format!("Page {}", id),
        path: path.to_string(),
        secure: false,
        creator: "admin".to_string(),
        created: at(TEST_EPOCH),
        modifier: None,
        modified: None,
        published: Some(at(TEST_EPOCH)),
        cache: None,
        embeds: None,
    }
}
