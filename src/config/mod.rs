//! Configuration module for the chat client.

mod i18n;
mod responses;

pub use i18n::{get_messages, Messages, MESSAGES_EN, MESSAGES_KO};
pub use responses::{get_reply_table, CannedReply, ReplyTable, REPLIES_EN, REPLIES_KO};
