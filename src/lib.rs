// Copyright 2025 The bedrock-chat Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Bedrock Chat
//!
//! Terminal chatbot that forwards the conversation to Claude on AWS Bedrock.
//!
//! Throttled calls are retried with exponential backoff (1s, 2s, 4s, 8s, 16s).
//! Every other failure becomes the reply text. With no credentials, or in
//! offline mode, a keyword responder answers locally.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bedrock_chat::{ChatSession, BedrockConnector, ClientConfig, Mode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let connector = BedrockConnector::new(ClientConfig::default());
//!     let mut session = ChatSession::new(connector, "ko").with_mode(Mode::Online);
//!
//!     let turn = session.submit("오늘 날씨 어때?").await;
//!     println!("{}", turn.reply);
//! }
//! ```

pub mod chat;
pub mod config;
pub mod conversation;
pub mod model;
pub mod settings;

pub use chat::{ChatSession, LocalResponder, Mode, SessionEvent, Turn};
pub use conversation::{Conversation, Message, Role};
pub use model::{
    init_bedrock_client, BedrockClient, BedrockConnector, ClientConfig, Credentials,
    Invocation, InvocationStatus, ModelError, RetryPolicy, RetryingInvoker,
};
pub use settings::AppSettings;
