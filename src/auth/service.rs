use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::password::verify_password;
use super::session::AuthSessionManager;
use super::AuthError;
use crate::database::UserStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

/// Username/password login on top of the session manager
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: AuthSessionManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: AuthSessionManager) -> Self {
        Self { users, sessions }
    }

    /// `Ok(None)` for an unknown user or a wrong password
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<LoginResult>, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            info!("Login rejected: unknown user");
            return Ok(None);
        };

        // bcrypt runs on the blocking pool
        let hash = user.password_hash.clone();
        let candidate = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .unwrap_or_else(|e| {
                warn!("Password verification task failed: {}", e);
                false
            });

        if !verified {
            info!("Login rejected for user {}", user.id);
            return Ok(None);
        }

        let token = self
            .sessions
            .issue_token(user.id, &user.username, user.global_permission)
            .await?;

        info!("User {} logged in", user.id);
        Ok(Some(LoginResult {
            token,
            user_id: user.id,
            username: user.username,
        }))
    }
}
