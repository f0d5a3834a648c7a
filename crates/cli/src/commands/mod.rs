pub mod ask;
pub mod chat;
pub mod init;
pub mod render;
pub mod serve;
pub mod status;
pub mod tools;
