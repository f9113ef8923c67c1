//! Model client module for Claude inference on AWS Bedrock.

mod client;
mod invoker;
mod signing;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    init_bedrock_client, BedrockClient, BedrockConnector, ClientConfig, ClientSlot, Credentials,
    ModelError, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use invoker::{
    Invocation, InvocationStatus, RetryPolicy, RetryingInvoker, Sleeper, ThrottleNotice,
    TokioSleeper, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
};
pub use signing::{sign_request, SignedHeaders, SigningParams};
pub use transport::{HandleProvider, InferenceTransport};
pub use types::{extract_text, InferenceRequest, ANTHROPIC_VERSION, MAX_OUTPUT_TOKENS, MODEL_ID};
