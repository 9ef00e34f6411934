pub mod embeds;
pub mod password;
