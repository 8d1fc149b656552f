//! Terminal chat widget that streams an assistant's reply from a chat
//! endpoint into the message list as it arrives.

pub mod app;
pub mod client;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod error;
pub mod handler;
pub mod tui;
pub mod ui;
pub mod worker;

// Re-export main types for convenience
pub use app::{App, SendState};
pub use client::{ChatClient, ReplyStream};
pub use config::Config;
pub use conversation::{Conversation, Message, Role};
pub use decoder::Utf8StreamDecoder;
pub use error::ChatError;
