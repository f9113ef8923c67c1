//! Test doubles for the transport and the backoff clock.

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::ModelError;
use super::invoker::Sleeper;
use super::transport::{HandleProvider, InferenceTransport};

/// Success body carrying a single text block.
pub(crate) fn ok_body(text: &str) -> Vec<u8> {
    json!({"content": [{"type": "text", "text": text}]})
        .to_string()
        .into_bytes()
}

/// Replays a fixed list of outcomes. Once the script runs out, every call is throttled.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Vec<u8>, ModelError>>>,
    requests: Mutex<Vec<(String, Value)>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<Vec<u8>, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub(crate) fn always_throttled() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<(String, Value)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl InferenceTransport for ScriptedTransport {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body: Value = serde_json::from_slice(&body).unwrap();
        self.requests
            .lock()
            .unwrap()
            .push((model_id.to_string(), body));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Throttled("Too many requests".to_string())))
    }
}

/// Hands out a shared [`ScriptedTransport`], or fails like a bad credential set.
pub(crate) struct ScriptedProvider {
    pub(crate) transport: Option<Arc<ScriptedTransport>>,
}

impl HandleProvider for ScriptedProvider {
    type Handle = ScriptedTransport;

    fn handle(&self) -> Result<Arc<ScriptedTransport>, ModelError> {
        self.transport
            .clone()
            .ok_or_else(|| ModelError::ClientInit("AWS_ACCESS_KEY_ID is not set".to_string()))
    }
}

/// Records requested delays instead of waiting.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }

    pub(crate) fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
