use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Membership row: the user may access resources tagged with `acl_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AclEntry {
    pub acl_id: i64,
    pub user_id: i64,
}
