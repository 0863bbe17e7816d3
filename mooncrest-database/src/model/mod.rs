pub mod assistant_chat;
pub mod users;
