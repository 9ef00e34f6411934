//! The `jwt` session cookie and the refresh header.

use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::AuthConfig;

/// Cookie carrying the session token
pub const AUTH_COOKIE: &str = "jwt";

/// Response header carrying a refreshed token
pub const REFRESH_HEADER: &str = "x-auth-token";

/// Deployment-specific cookie attributes
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    pub secure: bool,
    pub domain: Option<String>,
}

impl From<&AuthConfig> for CookieSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secure: config.cookie_secure,
            domain: config.cookie_domain.clone(),
        }
    }
}

fn base_cookie(value: String, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build((AUTH_COOKIE.to_string(), value))
        .path("/".to_string())
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .build();

    if let Some(domain) = &settings.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// `jwt=<token>; Path=/; HttpOnly; SameSite=Lax` plus Secure/Domain when configured
pub fn auth_cookie(token: &str, settings: &CookieSettings) -> Cookie<'static> {
    base_cookie(token.to_string(), settings)
}

/// Same attributes as [`auth_cookie`], empty value and already expired
pub fn cleared_auth_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), settings);
    cookie.make_removal();
    cookie
}

/// Append a `Set-Cookie` header; cookie values produced here are always valid header text
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Dropping unencodable cookie {}: {}", cookie.name(), e),
    }
}
