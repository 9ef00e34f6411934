// handlers/mod.rs - HTTP handlers by access tier
//
// Public (no session required) → Protected (session claims required).
// Page resolution sits outside both: it runs behind the session pipeline
// and the ACL gate decides per page.

pub mod debug;
pub mod pages;
pub mod protected;
pub mod public;
pub mod resolver;
