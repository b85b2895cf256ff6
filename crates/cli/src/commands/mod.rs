pub mod chat;
pub mod history;
pub mod library;
pub mod onboard;
pub mod status;
