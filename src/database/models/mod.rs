pub mod acl;
pub mod page;
pub mod token;
pub mod user;

pub use acl::AclEntry;
pub use page::Page;
pub use token::TokenRecord;
pub use user::User;
