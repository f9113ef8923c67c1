//! Request and response shapes of the Claude Messages API on Bedrock.
//!
//! The model id travels in the URL path, so the request body carries only the
//! protocol version, the output bound and the conversation.

use serde::Serialize;
use serde_json::Value;

use crate::conversation::{Conversation, Message};

/// Protocol version tag required by Claude models on Bedrock.
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Upper bound on generated tokens per reply.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Claude 3.5 Sonnet. There is no model selection.
pub const MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

/// Request body for `InvokeModel`.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest<'a> {
    pub anthropic_version: &'static str,
    pub max_tokens: u32,
    pub messages: &'a [Message],
}

impl<'a> InferenceRequest<'a> {
    /// Build a request carrying the whole conversation as-is.
    pub fn new(conversation: &'a Conversation) -> Self {
        Self {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: conversation.messages(),
        }
    }
}

/// Pull the generated text out of a response body.
///
/// Returns `content[0].text` when `content` is a non-empty array whose first
/// element is an object with a string `text` field, and `None` otherwise.
pub fn extract_text(body: &Value) -> Option<&str> {
    body.get("content")?
        .as_array()?
        .first()?
        .as_object()?
        .get("text")?
        .as_str()
}
