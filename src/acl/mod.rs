//! Resource authorization by ACL id.

pub mod engine;
pub mod gate;

pub use engine::AccessControlEngine;
pub use gate::{AccessDenial, ResourceAccessGate};

/// `None` and `0` mark a resource as public
pub fn is_public(acl_id: Option<i64>) -> bool {
    matches!(acl_id, None | Some(0))
}
