pub mod chat;
pub mod solve;
