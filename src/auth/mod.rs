//! Session tokens: signing, validation, sliding refresh and login.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseError;

pub mod clock;
pub mod codec;
pub mod cookies;
pub mod password;
pub mod service;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use codec::TokenCodec;
pub use cookies::CookieSettings;
pub use service::{AuthService, LoginResult};
pub use session::{AuthSessionManager, SessionEffect};

/// Decoded, trusted payload of a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    #[serde(default)]
    pub global_permission: bool,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issuance so two tokens minted in the same second differ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// The bearer string these claims were decoded from
    #[serde(skip)]
    pub token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token signature")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Password(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl AuthError {
    /// Malformed and badly signed tokens are treated as "no session"
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuthError::Malformed(_) | AuthError::SignatureInvalid)
    }
}
