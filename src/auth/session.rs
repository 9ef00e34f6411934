use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::CookieJar;
use chrono::{TimeZone, Utc};
use tracing::debug;
use uuid::Uuid;

use super::clock::Clock;
use super::codec::TokenCodec;
use super::cookies::{self, CookieSettings, AUTH_COOKIE, REFRESH_HEADER};
use super::{AuthError, Claims};
use crate::config::{AuthConfig, MAX_JWT_TTL_SECONDS};
use crate::database::TokenStore;

/// Paths that bypass token extraction and refresh entirely
pub const EXEMPT_PATHS: [&str; 2] = ["/api/login", "/api/logout"];

/// What the response must carry after an inbound request was processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// No token, or a token that was not ours
    None,
    /// Valid session: the successor token goes out as header and cookie
    Refresh(String),
    /// Expired session: 401 and the cookie is cleared
    Expired,
}

impl SessionEffect {
    /// Write the refresh header/cookie or the clearing cookie onto `headers`
    pub fn apply(&self, headers: &mut HeaderMap, settings: &CookieSettings) {
        match self {
            SessionEffect::None => {}
            SessionEffect::Refresh(token) => {
                match HeaderValue::from_str(token) {
                    Ok(value) => {
                        headers.insert(REFRESH_HEADER, value);
                    }
                    Err(e) => tracing::warn!("Refreshed token is not a valid header value: {}", e),
                }
                cookies::append_set_cookie(headers, &cookies::auth_cookie(token, settings));
            }
            SessionEffect::Expired => {
                cookies::append_set_cookie(headers, &cookies::cleared_auth_cookie(settings));
            }
        }
    }
}

/// Issues, validates and refreshes session tokens.
///
/// Every issued token is recorded in the [`TokenStore`] before it is handed out,
/// so ACL checks can tie a bearer token back to a live session.
#[derive(Clone)]
pub struct AuthSessionManager {
    codec: TokenCodec,
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    ttl_seconds: i64,
    cookies: CookieSettings,
}

impl AuthSessionManager {
    pub fn new(config: &AuthConfig, tokens: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        debug!(
            "Session manager using {:?} secret ({} bytes), ttl {}s",
            config.secret_source,
            config.jwt_secret.len(),
            config.jwt_ttl_seconds
        );

        Self {
            codec: TokenCodec::new(&config.jwt_secret),
            tokens,
            clock,
            ttl_seconds: config.jwt_ttl_seconds.min(MAX_JWT_TTL_SECONDS),
            cookies: CookieSettings::from(config),
        }
    }

    pub fn cookie_settings(&self) -> &CookieSettings {
        &self.cookies
    }

    pub fn is_exempt(path: &str) -> bool {
        EXEMPT_PATHS.contains(&path)
    }

    /// Sign a fresh token for the user and record it before returning it
    pub async fn issue_token(
        &self,
        user_id: i64,
        username: &str,
        global_permission: bool,
    ) -> Result<String, AuthError> {
        let issued_at = self.clock.now().timestamp();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            global_permission,
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl_seconds),
            jti: Some(Uuid::new_v4().to_string()),
            token: String::new(),
        };

        let token = self.codec.encode(&claims)?;

        let created = timestamp(claims.iat);
        let expires_at = timestamp(claims.exp);
        self.tokens
            .store_token(user_id, &token, created, expires_at)
            .await?;

        debug!("Issued token for user {} expiring at {}", user_id, claims.exp);
        Ok(token)
    }

    /// Verify signature and expiry. A token whose `exp` equals the current second is expired.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(token)?;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Re-issue for the same user, username and global permission flag
    pub async fn refresh_token(&self, claims: &Claims) -> Result<String, AuthError> {
        self.issue_token(claims.sub, &claims.username, claims.global_permission)
            .await
    }

    /// `Authorization: Bearer <token>` first, then the `jwt` cookie
    pub fn extract_token(auth_header: Option<&str>, jar: &CookieJar) -> Option<String> {
        if let Some(header) = auth_header.filter(|h| !h.is_empty()) {
            let parts: Vec<&str> = header.split(' ').collect();
            if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
                return Some(parts[1].to_string());
            }
        }

        jar.get(AUTH_COOKIE).map(|c| c.value().to_string())
    }

    /// Run the per-request session state machine.
    ///
    /// Invalid tokens fall open to anonymous; expired tokens do not. Only a
    /// failure to record the refreshed token surfaces as an error.
    pub async fn process_inbound(
        &self,
        auth_header: Option<&str>,
        jar: &CookieJar,
    ) -> Result<(Option<Claims>, SessionEffect), AuthError> {
        let Some(token) = Self::extract_token(auth_header, jar) else {
            debug!("No session token on request");
            return Ok((None, SessionEffect::None));
        };

        let claims = match self.validate(&token) {
            Ok(claims) => claims,
            Err(AuthError::Expired) => {
                debug!("Session token expired");
                return Ok((None, SessionEffect::Expired));
            }
            Err(e) if e.is_recoverable() => {
                debug!("Ignoring unusable session token: {}", e);
                return Ok((None, SessionEffect::None));
            }
            Err(e) => return Err(e),
        };

        debug!("Authenticated user {} ({})", claims.sub, claims.username);
        let refreshed = self.refresh_token(&claims).await?;
        Ok((Some(claims), SessionEffect::Refresh(refreshed)))
    }
}

fn timestamp(seconds: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretSource;
    use crate::testing::{FixedClock, MemoryTokenStore};
    use axum_extra::extract::cookie::Cookie;

    fn config(secret: &str, ttl: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            secret_source: SecretSource::Explicit,
            jwt_ttl_seconds: ttl,
            cookie_secure: false,
            cookie_domain: None,
        }
    }

    fn manager(ttl: i64) -> (AuthSessionManager, Arc<MemoryTokenStore>, Arc<FixedClock>) {
        let store = Arc::new(MemoryTokenStore::default());
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let manager = AuthSessionManager::new(&config("test-secret", ttl), store.clone(), clock.clone());
        (manager, store, clock)
    }

    #[tokio::test]
    async fn issue_then_validate_round_trip() {
        let (manager, store, _) = manager(1200);
        let token = manager.issue_token(42, "alice", false).await.unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert!(!claims.global_permission);
        assert_eq!(claims.exp - claims.iat, 1200);
        assert_eq!(claims.token, token);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn oversized_ttl_is_capped() {
        let (manager, store, _) = manager(i64::MAX);
        let token = manager.issue_token(7, "carol", false).await.unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_JWT_TTL_SECONDS);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn exp_equal_to_now_is_expired() {
        let (manager, _, clock) = manager(60);
        let token = manager.issue_token(1, "bob", false).await.unwrap();

        clock.advance(59);
        assert!(manager.validate(&token).is_ok());

        clock.advance(1);
        assert!(matches!(manager.validate(&token), Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn same_second_tokens_differ() {
        let (manager, store, _) = manager(1200);
        let a = manager.issue_token(1, "bob", false).await.unwrap();
        let b = manager.issue_token(1, "bob", false).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn refresh_keeps_identity() {
        let (manager, _, clock) = manager(1200);
        let token = manager.issue_token(7, "carol", true).await.unwrap();
        let claims = manager.validate(&token).unwrap();

        clock.advance(100);
        let refreshed = manager.refresh_token(&claims).await.unwrap();
        let next = manager.validate(&refreshed).unwrap();
        assert_eq!(next.sub, 7);
        assert_eq!(next.username, "carol");
        assert!(next.global_permission);
        assert_eq!(next.iat, claims.iat + 100);
    }

    #[test]
    fn header_wins_over_cookie() {
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, "from-cookie"));
        assert_eq!(
            AuthSessionManager::extract_token(Some("Bearer from-header"), &jar).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            AuthSessionManager::extract_token(Some("bEaReR from-header"), &jar).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn malformed_header_falls_back_to_cookie() {
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, "from-cookie"));
        for header in ["Bearer", "Basic abc", "Bearer a b", ""] {
            assert_eq!(
                AuthSessionManager::extract_token(Some(header), &jar).as_deref(),
                Some("from-cookie"),
                "header {:?}",
                header
            );
        }
        assert_eq!(AuthSessionManager::extract_token(None, &CookieJar::new()), None);
    }

    #[tokio::test]
    async fn inbound_without_token_is_anonymous() {
        let (manager, store, _) = manager(1200);
        let (claims, effect) = manager.process_inbound(None, &CookieJar::new()).await.unwrap();
        assert!(claims.is_none());
        assert_eq!(effect, SessionEffect::None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn inbound_with_foreign_token_fails_open() {
        let (manager, _, clock) = manager(1200);
        let other = AuthSessionManager::new(
            &config("other-secret", 1200),
            Arc::new(MemoryTokenStore::default()),
            clock,
        );
        let foreign = other.issue_token(1, "mallory", true).await.unwrap();
        let header = format!("Bearer {}", foreign);

        let (claims, effect) = manager
            .process_inbound(Some(&header), &CookieJar::new())
            .await
            .unwrap();
        assert!(claims.is_none());
        assert_eq!(effect, SessionEffect::None);

        let (claims, effect) = manager
            .process_inbound(Some("Bearer garbage"), &CookieJar::new())
            .await
            .unwrap();
        assert!(claims.is_none());
        assert_eq!(effect, SessionEffect::None);
    }

    #[tokio::test]
    async fn inbound_with_expired_token_clears() {
        let (manager, _, clock) = manager(60);
        let token = manager.issue_token(1, "bob", false).await.unwrap();
        clock.advance(60);

        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, token));
        let (claims, effect) = manager.process_inbound(None, &jar).await.unwrap();
        assert!(claims.is_none());
        assert_eq!(effect, SessionEffect::Expired);

        let mut headers = HeaderMap::new();
        effect.apply(&mut headers, manager.cookie_settings());
        let cookie = headers.get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("jwt=;"));
        assert!(headers.get(REFRESH_HEADER).is_none());
    }

    #[tokio::test]
    async fn inbound_with_valid_token_refreshes() {
        let (manager, store, _) = manager(1200);
        let token = manager.issue_token(5, "dave", false).await.unwrap();
        let header = format!("Bearer {}", token);

        let (claims, effect) = manager
            .process_inbound(Some(&header), &CookieJar::new())
            .await
            .unwrap();
        assert_eq!(claims.unwrap().sub, 5);
        let SessionEffect::Refresh(refreshed) = &effect else {
            panic!("expected refresh, got {:?}", effect);
        };
        assert_ne!(refreshed, &token);
        assert_eq!(store.len(), 2);

        let mut headers = HeaderMap::new();
        effect.apply(&mut headers, manager.cookie_settings());
        assert_eq!(headers.get(REFRESH_HEADER).unwrap(), refreshed.as_str());
        let cookie = headers.get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("jwt={}", refreshed)));
    }

    #[test]
    fn login_and_logout_are_exempt() {
        assert!(AuthSessionManager::is_exempt("/api/login"));
        assert!(AuthSessionManager::is_exempt("/api/logout"));
        assert!(!AuthSessionManager::is_exempt("/api/login/extra"));
        assert!(!AuthSessionManager::is_exempt("/index"));
    }
}
