//! bcrypt password hashes as written by the legacy user admin (`$2y$`, cost 12).

use super::AuthError;

pub const BCRYPT_COST: u32 = 12;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::Password(e.to_string()))
}

/// A stored hash that cannot be parsed verifies as false
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}
