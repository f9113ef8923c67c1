//! Seams between the retry loop and the network.

use std::future::Future;
use std::sync::Arc;

use super::client::ModelError;

/// Something that can send one `InvokeModel` call.
///
/// Returns the raw response body on success. Throttling must surface as an
/// error for which [`ModelError::is_throttling`] is true.
pub trait InferenceTransport: Send + Sync {
    fn invoke_model(
        &self,
        model_id: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, ModelError>> + Send;
}

/// Source of a cached, ready-to-use transport handle.
pub trait HandleProvider {
    type Handle: InferenceTransport;

    /// Return the handle, constructing it on first use.
    fn handle(&self) -> Result<Arc<Self::Handle>, ModelError>;
}
