// handlers/public/mod.rs - Public handlers (no session required)
//
// Login and logout bypass the session pipeline entirely. Page content is
// public at the route level; the ACL gate still applies per page.

pub mod auth;
pub mod health;
pub mod page_content;

pub use health::health_get;
pub use page_content::page_content_get;
