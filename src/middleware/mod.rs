pub mod auth;
pub mod session;

pub use auth::require_auth;
pub use session::session_middleware;
