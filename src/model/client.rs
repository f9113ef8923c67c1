//! Authenticated Bedrock Runtime client and its process-wide cache.

use chrono::Utc;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::signing::{sign_request, uri_encode, SigningParams};
use super::transport::{HandleProvider, InferenceTransport};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// SigV4 service name for Bedrock Runtime.
const SERVICE: &str = "bedrock";

static REGION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("valid region pattern"));

/// Process-wide handle used by [`init_bedrock_client`] and [`BedrockConnector`].
static SHARED_CLIENT: Lazy<ClientSlot> = Lazy::new(ClientSlot::new);

/// Model client errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Request throttled: {0}")]
    Throttled(String),
    #[error("{message} (HTTP {status})")]
    Service {
        status: u16,
        error_type: Option<String>,
        message: String,
    },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ModelError {
    /// Build an error from a non-success HTTP response.
    ///
    /// `error_type` is the raw `x-amzn-ErrorType` header, e.g.
    /// `ValidationException:http://internal.amazon.com/coral/com.amazon.bedrock/`.
    pub fn from_response(status: u16, error_type: Option<&str>, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        let error_type = error_type
            .and_then(|raw| raw.split(':').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| {
                parsed
                    .as_ref()
                    .and_then(|v| v.get("__type"))
                    .and_then(Value::as_str)
                    .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
            });

        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("Message")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    reqwest::StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    body.trim().to_string()
                }
            });

        if status == 429 || error_type.as_deref() == Some("ThrottlingException") {
            return ModelError::Throttled(message);
        }

        ModelError::Service {
            status,
            error_type,
            message,
        }
    }

    /// Whether the service asked the caller to slow down.
    pub fn is_throttling(&self) -> bool {
        matches!(self, ModelError::Throttled(_))
    }

    /// Short error kind shown next to the description.
    pub fn category(&self) -> &str {
        match self {
            ModelError::ClientInit(_) => "ClientInit",
            ModelError::RequestFailed(_) => "RequestFailed",
            ModelError::Throttled(_) => "ThrottlingException",
            ModelError::Service {
                error_type: Some(t),
                ..
            } => t.as_str(),
            ModelError::Service { .. } => "HttpStatus",
            ModelError::ParseError(_) => "ParseError",
        }
    }
}

/// AWS credentials and region used to sign requests.
#[derive(Debug)]
pub struct Credentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl Credentials {
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: None,
        }
    }

    /// Attach a temporary session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::from(token.into()));
        self
    }

    /// Read credentials from the standard AWS environment variables.
    pub fn from_env() -> Result<Self, ModelError> {
        let region = env::var("AWS_DEFAULT_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .map_err(|_| ModelError::ClientInit("AWS_DEFAULT_REGION is not set".to_string()))?;
        let access_key_id = env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ModelError::ClientInit("AWS_ACCESS_KEY_ID is not set".to_string()))?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ModelError::ClientInit("AWS_SECRET_ACCESS_KEY is not set".to_string())
        })?;

        let credentials = Self::new(region, access_key_id, secret_access_key);
        Ok(match env::var("AWS_SESSION_TOKEN") {
            Ok(token) if !token.is_empty() => credentials.with_session_token(token),
            _ => credentials,
        })
    }
}

/// Connection options that are not credentials.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint override, e.g. a VPC interface endpoint. Defaults to the
    /// regional `bedrock-runtime` host.
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

/// Authenticated handle to the Bedrock Runtime API.
///
/// Not `Debug`, so key material cannot end up in logs.
pub struct BedrockClient {
    http: Client,
    endpoint: Url,
    host: String,
    region: String,
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl BedrockClient {
    /// Validate the credentials and build the HTTP client.
    pub fn connect(credentials: Credentials, config: &ClientConfig) -> Result<Self, ModelError> {
        if !REGION_PATTERN.is_match(&credentials.region) {
            return Err(ModelError::ClientInit(format!(
                "invalid region '{}'",
                credentials.region
            )));
        }
        if credentials.access_key_id.trim().is_empty() {
            return Err(ModelError::ClientInit("access key id is empty".to_string()));
        }
        if credentials.secret_access_key.expose_secret().trim().is_empty() {
            return Err(ModelError::ClientInit(
                "secret access key is empty".to_string(),
            ));
        }

        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", credentials.region)
        });
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| ModelError::ClientInit(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ModelError::ClientInit(format!(
                    "endpoint '{}' has no host",
                    endpoint
                )))
            }
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ModelError::ClientInit(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(region = %credentials.region, host = %host, "Bedrock client ready");

        Ok(Self {
            http,
            endpoint,
            host,
            region: credentials.region,
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Request path for `InvokeModel`, encoded once.
    fn invoke_path(&self, model_id: &str) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        format!("{}/model/{}/invoke", base, uri_encode(model_id))
    }
}

impl InferenceTransport for BedrockClient {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, ModelError> {
        let path = self.invoke_path(model_id);
        let url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host,
            path
        );

        let signed = sign_request(
            &SigningParams {
                access_key_id: &self.access_key_id,
                secret_access_key: self.secret_access_key.expose_secret(),
                session_token: self.session_token.as_ref().map(|t| t.expose_secret()),
                region: &self.region,
                service: SERVICE,
                time: Utc::now(),
            },
            "POST",
            &self.host,
            &path,
            "application/json",
            &body,
        );

        tracing::debug!(url = %url, model_id = %model_id, "Bedrock invoke request");

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-Amz-Date", &signed.amz_date)
            .header("Authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request.body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_type = response
                .headers()
                .get("x-amzn-ErrorType")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error_type = ?error_type, "Bedrock API error response");
            return Err(ModelError::from_response(
                status.as_u16(),
                error_type.as_deref(),
                &error_body,
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Init-once cache for a [`BedrockClient`].
///
/// A successful construction is kept for the life of the slot. A failed one
/// is not cached, so the next call tries again.
#[derive(Default)]
pub struct ClientSlot {
    cell: OnceCell<Arc<BedrockClient>>,
}

impl ClientSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client, if one was built.
    pub fn get(&self) -> Option<Arc<BedrockClient>> {
        self.cell.get().cloned()
    }

    /// Return the cached client or construct it from `credentials`.
    pub fn get_or_init(
        &self,
        credentials: Credentials,
        config: &ClientConfig,
    ) -> Result<Arc<BedrockClient>, ModelError> {
        self.get_or_connect(|| Ok(credentials), config)
    }

    /// Like [`ClientSlot::get_or_init`], but `credentials` only runs when no
    /// client is cached yet.
    pub fn get_or_connect<F>(
        &self,
        credentials: F,
        config: &ClientConfig,
    ) -> Result<Arc<BedrockClient>, ModelError>
    where
        F: FnOnce() -> Result<Credentials, ModelError>,
    {
        self.cell
            .get_or_try_init(|| BedrockClient::connect(credentials()?, config).map(Arc::new))
            .cloned()
    }
}

fn shared_client<F>(
    credentials: F,
    config: &ClientConfig,
) -> Result<Arc<BedrockClient>, ModelError>
where
    F: FnOnce() -> Result<Credentials, ModelError>,
{
    SHARED_CLIENT
        .get_or_connect(credentials, config)
        .map_err(|e| {
            tracing::error!("Bedrock client initialization failed: {}", e);
            e
        })
}

/// Return the process-wide Bedrock client, building it on first use.
///
/// Failures are logged and reported as `None`.
pub fn init_bedrock_client(
    credentials: Credentials,
    config: &ClientConfig,
) -> Option<Arc<BedrockClient>> {
    shared_client(|| Ok(credentials), config).ok()
}

/// [`HandleProvider`] backed by the process-wide client and environment credentials.
#[derive(Debug, Clone, Default)]
pub struct BedrockConnector {
    config: ClientConfig,
}

impl BedrockConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl HandleProvider for BedrockConnector {
    type Handle = BedrockClient;

    fn handle(&self) -> Result<Arc<BedrockClient>, ModelError> {
        shared_client(Credentials::from_env, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MODEL_ID;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn credentials(region: &str) -> Credentials {
        Credentials::new(region, "AKIDEXAMPLE", "secret")
    }

    #[test]
    fn test_connect_rejects_bad_region() {
        let err = BedrockClient::connect(credentials("Seoul"), &ClientConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::ClientInit(_)));
    }

    #[test]
    fn test_connect_rejects_empty_keys() {
        let creds = Credentials::new("us-east-1", "", "secret");
        assert!(BedrockClient::connect(creds, &ClientConfig::default()).is_err());

        let creds = Credentials::new("us-east-1", "AKIDEXAMPLE", "  ");
        assert!(BedrockClient::connect(creds, &ClientConfig::default()).is_err());
    }

    #[test]
    fn test_connect_rejects_bad_endpoint() {
        let config = ClientConfig::default().with_endpoint("not a url");
        assert!(BedrockClient::connect(credentials("us-east-1"), &config).is_err());
    }

    #[test]
    fn test_default_endpoint_and_path() {
        let client =
            BedrockClient::connect(credentials("ap-northeast-2"), &ClientConfig::default())
                .unwrap();
        assert_eq!(client.host, "bedrock-runtime.ap-northeast-2.amazonaws.com");
        assert_eq!(
            client.invoke_path("anthropic.claude-3-5-sonnet-20240620-v1:0"),
            "/model/anthropic.claude-3-5-sonnet-20240620-v1%3A0/invoke"
        );
    }

    #[test]
    fn test_endpoint_override_keeps_port() {
        let config = ClientConfig::default().with_endpoint("http://localhost:4566");
        let client = BedrockClient::connect(credentials("us-east-1"), &config).unwrap();
        assert_eq!(client.host, "localhost:4566");
        assert_eq!(client.invoke_path("m"), "/model/m/invoke");
    }

    #[test]
    fn test_slot_caches_handle() {
        let slot = ClientSlot::new();
        let first = slot
            .get_or_init(credentials("us-east-1"), &ClientConfig::default())
            .unwrap();
        let second = slot
            .get_or_init(credentials("eu-west-1"), &ClientConfig::default())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.region(), "us-east-1");
    }

    #[test]
    fn test_slot_retries_after_failure() {
        let slot = ClientSlot::new();
        assert!(slot
            .get_or_init(credentials("bad"), &ClientConfig::default())
            .is_err());
        assert!(slot.get().is_none());

        let client = slot
            .get_or_init(credentials("us-west-2"), &ClientConfig::default())
            .unwrap();
        assert!(Arc::ptr_eq(&client, &slot.get().unwrap()));
    }

    #[test]
    fn test_init_bedrock_client_returns_cached_instance() {
        let first = init_bedrock_client(credentials("us-east-1"), &ClientConfig::default());
        let second = init_bedrock_client(credentials("us-east-1"), &ClientConfig::default());
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    }

    #[test]
    fn test_slot_skips_credentials_when_cached() {
        let slot = ClientSlot::new();
        let first = slot
            .get_or_init(credentials("us-east-1"), &ClientConfig::default())
            .unwrap();
        let second = slot
            .get_or_connect(
                || Err(ModelError::ClientInit("credentials were read".to_string())),
                &ClientConfig::default(),
            )
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_connector_shares_process_wide_client() {
        let client =
            init_bedrock_client(credentials("us-east-1"), &ClientConfig::default()).unwrap();
        let handle = BedrockConnector::default().handle().unwrap();
        assert!(Arc::ptr_eq(&client, &handle));
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &str,
        extra_headers: &str,
        body: &str,
    ) -> (String, JoinHandle<String>) {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            extra_headers,
            body.len(),
            body
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}", addr), server)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    fn loopback_client(endpoint: &str) -> BedrockClient {
        let config = ClientConfig::default()
            .with_endpoint(endpoint)
            .with_request_timeout(10);
        BedrockClient::connect(
            credentials("us-east-1").with_session_token("session"),
            &config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_model_sends_signed_request() {
        let reply = r#"{"content":[{"type":"text","text":"hello"}]}"#;
        let (endpoint, server) = serve_once("200 OK", "", reply).await;
        let client = loopback_client(&endpoint);

        let body = client
            .invoke_model(MODEL_ID, br#"{"messages":[]}"#.to_vec())
            .await
            .unwrap();
        assert_eq!(body, reply.as_bytes());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with(
            "post /model/anthropic.claude-3-5-sonnet-20240620-v1%3a0/invoke http/1.1"
        ));
        assert!(request.contains("authorization: aws4-hmac-sha256 credential=akidexample/"));
        assert!(request.contains("x-amz-security-token: session"));
        assert!(request.contains("x-amz-date: "));
        assert!(request.ends_with(r#"{"messages":[]}"#));
    }

    #[tokio::test]
    async fn test_invoke_model_maps_throttling_status() {
        let (endpoint, server) =
            serve_once("429 Too Many Requests", "", r#"{"message":"Too many requests"}"#).await;
        let client = loopback_client(&endpoint);

        let err = client.invoke_model("m", b"{}".to_vec()).await.err().unwrap();
        assert!(err.is_throttling());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_invoke_model_reads_error_type_header() {
        let (endpoint, server) = serve_once(
            "400 Bad Request",
            "x-amzn-ErrorType: ValidationException:http://internal.amazon.com/coral/com.amazon.bedrock/\r\n",
            r#"{"message":"max_tokens: must be positive"}"#,
        )
        .await;
        let client = loopback_client(&endpoint);

        let err = client.invoke_model("m", b"{}".to_vec()).await.err().unwrap();
        assert!(!err.is_throttling());
        assert_eq!(err.category(), "ValidationException");
        assert_eq!(err.to_string(), "max_tokens: must be positive (HTTP 400)");
        server.await.unwrap();
    }

    #[test]
    fn test_throttling_classification() {
        let err = ModelError::from_response(429, None, r#"{"message":"Too many requests"}"#);
        assert!(err.is_throttling());
        assert_eq!(err.category(), "ThrottlingException");

        let err = ModelError::from_response(
            400,
            Some("ThrottlingException:http://internal.amazon.com/coral/com.amazon.bedrock/"),
            "",
        );
        assert!(err.is_throttling());
    }

    #[test]
    fn test_service_error_classification() {
        let err = ModelError::from_response(
            400,
            Some("ValidationException:http://internal.amazon.com/coral/com.amazon.bedrock/"),
            r#"{"message":"messages: roles must alternate"}"#,
        );
        assert!(!err.is_throttling());
        assert_eq!(err.category(), "ValidationException");
        assert_eq!(err.to_string(), "messages: roles must alternate (HTTP 400)");

        let err = ModelError::from_response(
            403,
            None,
            r#"{"__type":"com.amazon.coral.service#AccessDeniedException","Message":"denied"}"#,
        );
        assert_eq!(err.category(), "AccessDeniedException");

        let err = ModelError::from_response(502, None, "");
        assert_eq!(err.category(), "HttpStatus");
        assert_eq!(err.to_string(), "Bad Gateway (HTTP 502)");
    }
}
