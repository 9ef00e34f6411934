// handlers/public/auth/mod.rs - Login and logout

pub mod login;  // POST /api/login
pub mod logout; // POST /api/logout

pub use login::login_post;
pub use logout::logout_post;
