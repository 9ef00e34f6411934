// handlers/protected/mod.rs - Protected handlers (session claims required)
//
// Routes here sit behind `middleware::require_auth`, so the session
// middleware must have attached claims.

pub mod auth;

pub use auth::whoami_get;
