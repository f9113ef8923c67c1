//! Conversation history shared between the chat session and the model client.

mod history;

pub use history::{Conversation, Message, Role};
