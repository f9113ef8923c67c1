//! Model invocation with exponential backoff on throttling.

use std::future::Future;
use std::time::Duration;

use crate::config::Messages;
use crate::conversation::Conversation;

use super::client::ModelError;
use super::transport::InferenceTransport;
use super::types::{extract_text, InferenceRequest, MODEL_ID};

/// Total attempts per call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry. Doubles on every further throttled attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait after the throttled attempt with index `retry_index` (0-based):
    /// `base_delay * 2^retry_index`.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        2u32.checked_pow(retry_index)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Blocking wait between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real wall-clock wait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Emitted before each backoff wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleNotice {
    /// 1-based number of the attempt that was throttled.
    pub attempt: u32,
    pub delay: Duration,
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    /// The service answered. The reply may still be the "no text found" string.
    Completed,
    /// A non-throttling error stopped the call.
    Failed,
    /// Every attempt was throttled.
    Exhausted,
}

/// Result of [`RetryingInvoker::invoke_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub reply: String,
    pub attempts: u32,
    pub status: InvocationStatus,
}

/// Outcome of a single attempt.
enum Attempt {
    Reply(Option<String>),
    RateLimited(ModelError),
    Failed(ModelError),
}

impl From<Result<Option<String>, ModelError>> for Attempt {
    fn from(result: Result<Option<String>, ModelError>) -> Self {
        match result {
            Ok(text) => Attempt::Reply(text),
            Err(e) if e.is_throttling() => Attempt::RateLimited(e),
            Err(e) => Attempt::Failed(e),
        }
    }
}

type ThrottleObserver = Box<dyn Fn(&ThrottleNotice) + Send + Sync>;

/// Sends a conversation to the model and turns every outcome into reply text.
///
/// Nothing escapes as an error. Throttling is retried under [`RetryPolicy`];
/// any other failure ends the call at once with a descriptive reply.
pub struct RetryingInvoker<S = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
    messages: &'static Messages,
    on_throttle: Option<ThrottleObserver>,
}

impl RetryingInvoker<TokioSleeper> {
    pub fn new(messages: &'static Messages) -> Self {
        Self {
            policy: RetryPolicy::default(),
            sleeper: TokioSleeper,
            messages,
            on_throttle: None,
        }
    }
}

impl<S: Sleeper> RetryingInvoker<S> {
    /// Replace the delay function, e.g. with an instrumented clock.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RetryingInvoker<T> {
        RetryingInvoker {
            policy: self.policy,
            sleeper,
            messages: self.messages,
            on_throttle: self.on_throttle,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Called before every backoff wait.
    pub fn with_throttle_observer(
        mut self,
        observer: impl Fn(&ThrottleNotice) + Send + Sync + 'static,
    ) -> Self {
        self.on_throttle = Some(Box::new(observer));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke the model and return only the reply text.
    pub async fn invoke<T: InferenceTransport>(
        &self,
        transport: &T,
        conversation: &Conversation,
    ) -> String {
        self.invoke_detailed(transport, conversation).await.reply
    }

    /// Invoke the model, reporting attempts and the terminal status.
    pub async fn invoke_detailed<T: InferenceTransport>(
        &self,
        transport: &T,
        conversation: &Conversation,
    ) -> Invocation {
        if !conversation.ends_with_user() {
            tracing::warn!("Invoking model with a conversation that does not end with a user message");
        }

        let body = match serde_json::to_vec(&InferenceRequest::new(conversation)) {
            Ok(body) => body,
            Err(e) => {
                return self.failed(&ModelError::ParseError(e.to_string()), 0);
            }
        };

        for retry_index in 0..self.policy.max_attempts {
            let attempt = retry_index + 1;
            tracing::debug!(
                model_id = MODEL_ID,
                attempt,
                messages = conversation.len(),
                "Invoking model"
            );

            let result = transport
                .invoke_model(MODEL_ID, body.clone())
                .await
                .and_then(|bytes| parse_reply(&bytes));

            match Attempt::from(result) {
                Attempt::Reply(text) => {
                    return Invocation {
                        reply: text.unwrap_or_else(|| self.messages.no_text_found.to_string()),
                        attempts: attempt,
                        status: InvocationStatus::Completed,
                    };
                }
                Attempt::RateLimited(e) => {
                    let delay = self.policy.delay_for(retry_index);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Throttled by Bedrock: {}",
                        e
                    );
                    if let Some(observer) = &self.on_throttle {
                        observer(&ThrottleNotice { attempt, delay });
                    }
                    self.sleeper.sleep(delay).await;
                }
                Attempt::Failed(e) => return self.failed(&e, attempt),
            }
        }

        tracing::error!(
            attempts = self.policy.max_attempts,
            "Max retries exceeded while throttled"
        );
        Invocation {
            reply: self.messages.max_retries_exceeded.to_string(),
            attempts: self.policy.max_attempts,
            status: InvocationStatus::Exhausted,
        }
    }

    fn failed(&self, error: &ModelError, attempts: u32) -> Invocation {
        tracing::error!(category = error.category(), "Model invocation failed: {}", error);
        Invocation {
            reply: self
                .messages
                .error_reply(&error.to_string(), error.category()),
            attempts,
            status: InvocationStatus::Failed,
        }
    }
}

/// Decode a success body. `Ok(None)` means the body had no usable text.
fn parse_reply(bytes: &[u8]) -> Result<Option<String>, ModelError> {
    let body: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ModelError::ParseError(e.to_string()))?;
    Ok(extract_text(&body).map(str::to_string))
}
