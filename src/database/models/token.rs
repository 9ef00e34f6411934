use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row per issued session token
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub creator: i64,
    pub created: DateTime<Utc>,
    #[sqlx(rename = "expires")]
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// A stored token is valid strictly before its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_instant_is_not_valid() {
        let now = Utc::now();
        let record = TokenRecord {
            id: 1,
            user_id: 7,
            token: "t".to_string(),
            creator: 1,
            created: now - Duration::seconds(10),
            expires_at: now,
        };
        assert!(!record.is_valid_at(now));
        assert!(record.is_valid_at(now - Duration::seconds(1)));
    }
}
