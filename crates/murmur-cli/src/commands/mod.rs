pub mod chat;
pub mod discuss;
pub mod init;
pub mod models;
pub mod personas;
