pub mod client;
pub mod export;
pub mod messages;
pub mod protocol;
pub mod reveal;
pub mod server;
pub mod sse;
pub mod tips;
pub mod transcript;
pub mod ui;
