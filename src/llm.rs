//! Completion provider abstraction and OpenAI-compatible implementation.
//!
//! This module provides a generic [`CompletionProvider`] trait for single-turn
//! chat completions, along with concrete implementations:
//!
//! - [`OpenAiClient`]: production client for OpenAI-compatible chat completion APIs
//! - [`MockProvider`]: test double for unit tests
//!
//! Used by the category suggester to resolve labels for uncategorized products.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during completion requests.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with HTTP 429.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider answered with HTTP 401 or 403.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP or network error occurred.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse the API response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Model returned no text content.
    #[error("Model returned empty response")]
    EmptyResponse,
}

/// Map a non-success HTTP status to the matching [`LlmError`].
///
/// Returns `None` for 2xx statuses.
pub fn classify_status(status: u16, body: &str) -> Option<LlmError> {
    match status {
        200..=299 => None,
        429 => Some(LlmError::RateLimited(body.to_string())),
        401 | 403 => Some(LlmError::Unauthorized(body.to_string())),
        _ => Some(LlmError::Http(format!("HTTP {status}: {body}"))),
    }
}

// ============================================================================
// Completion Type
// ============================================================================

/// The result of a successful completion request.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated text from the model.
    pub text: String,
}

// ============================================================================
// CompletionProvider Trait
// ============================================================================

/// Generic interface for completion providers.
///
/// Supports simple system+user prompt completion with text response.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion given a system prompt and user message.
    ///
    /// # Arguments
    ///
    /// * `system` - System-level instructions for the model
    /// * `user` - User message or prompt
    ///
    /// # Returns
    ///
    /// A [`Completion`] containing the model's response text.
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, LlmError>;
}

// ============================================================================
// OpenAI-compatible Implementation
// ============================================================================

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    api_key: String,
    project: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// A message in the conversation.
#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiClient {
    /// Create a client from explicit provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key,
            project: config.project,
            endpoint: config.endpoint,
            model: config.model,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json");
        if let Some(ref project) = self.project {
            request = request.header("OpenAI-Project", project);
        }

        let response = request
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body)
                .unwrap_or_else(|| LlmError::Http(format!("HTTP {status}"))));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content;

        Ok(Completion { text })
    }
}

// ============================================================================
// Mock Implementation (Test Only)
// ============================================================================

/// Mock provider for testing. Returns pre-programmed results in FIFO order.
#[cfg(test)]
pub struct MockProvider {
    /// Pre-programmed results to return in FIFO order.
    pub responses: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    /// Number of `complete` calls received.
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    /// Create a mock that answers every call successfully, in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Create a mock with a mix of successes and failures.
    ///
    /// # Panics
    ///
    /// [`complete`](CompletionProvider::complete) panics when called more
    /// times than there are results.
    pub fn with_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(results.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, _system: &str, _user: &str) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockProvider: no more responses available");

        next.map(|text| Completion { text })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn test_classify_success() {
        assert!(classify_status(200, "").is_none());
        assert!(classify_status(204, "").is_none());
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_status(429, "too many requests").unwrap();
        assert!(matches!(err, LlmError::RateLimited(ref body) if body == "too many requests"));
    }

    #[test]
    fn test_classify_auth() {
        assert!(matches!(
            classify_status(401, "bad key"),
            Some(LlmError::Unauthorized(_))
        ));
        assert!(matches!(
            classify_status(403, "forbidden"),
            Some(LlmError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_classify_server_error_keeps_status() {
        let err = classify_status(503, "overloaded").unwrap();
        assert_eq!(err.to_string(), "HTTP error: HTTP 503: overloaded");
    }

    #[test]
    fn test_chat_response_parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Electronics"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Electronics");
    }

    #[test]
    fn test_chat_response_without_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = ProviderConfig {
            api_key: "sk-test".into(),
            project: Some("proj_123".into()),
            endpoint: "http://localhost:9/v1/chat/completions".into(),
            model: "test-model".into(),
            max_tokens: 8,
            timeout_secs: 1,
        };
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.model, "test-model");
        assert_eq!(client.project.as_deref(), Some("proj_123"));
    }

    #[tokio::test]
    async fn test_mock_returns_results_in_order() {
        let mock = MockProvider::with_results(vec![
            Ok("first".to_string()),
            Err(LlmError::RateLimited(String::new())),
            Ok("third".to_string()),
        ]);

        assert_eq!(mock.complete("sys", "user").await.unwrap().text, "first");
        assert!(matches!(
            mock.complete("sys", "user").await,
            Err(LlmError::RateLimited(_))
        ));
        assert_eq!(mock.complete("sys", "user").await.unwrap().text, "third");
        assert_eq!(mock.call_count(), 3);
    }

    // --- OpenAiClient against a local HTTP stub ---

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let content_length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    fn stub_client(endpoint: String, project: Option<&str>) -> OpenAiClient {
        let mut config = ProviderConfig::new("sk-test");
        config.endpoint = endpoint;
        config.project = project.map(str::to_string);
        config.model = "test-model".into();
        config.timeout_secs = 5;
        OpenAiClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_complete_sends_auth_headers_and_parses_choice() {
        let (endpoint, server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Electronics"}}]}"#,
        )
        .await;
        let client = stub_client(endpoint, Some("proj_123"));

        let completion = client.complete("be brief", "Product: USB Cable").await.unwrap();
        assert_eq!(completion.text, "Electronics");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /v1/chat/completions"));
        assert!(request.contains("authorization: bearer sk-test"));
        assert!(request.contains("openai-project: proj_123"));
        assert!(request.contains(r#""model":"test-model""#));
        assert!(request.contains("product: usb cable"));
    }

    #[tokio::test]
    async fn test_complete_omits_project_header_when_unset() {
        let (endpoint, server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Home"}}]}"#,
        )
        .await;
        let client = stub_client(endpoint, None);

        client.complete("sys", "user").await.unwrap();

        let request = server.await.unwrap().to_lowercase();
        assert!(!request.contains("openai-project"));
    }

    #[tokio::test]
    async fn test_complete_passes_blank_content_through() {
        let (endpoint, _server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#,
        )
        .await;
        let client = stub_client(endpoint, None);

        let completion = client.complete("sys", "user").await.unwrap();
        assert_eq!(completion.text, "   ");
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty_response() {
        let (endpoint, _server) = serve_once(200, r#"{"choices":[]}"#).await;
        let client = stub_client(endpoint, None);

        let result = client.complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_complete_invalid_json_is_parse_error() {
        let (endpoint, _server) = serve_once(200, "not json").await;
        let client = stub_client(endpoint, None);

        let result = client.complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_complete_maps_error_statuses() {
        let (endpoint, _server) = serve_once(429, r#"{"error":"slow down"}"#).await;
        let result = stub_client(endpoint, None).complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::RateLimited(ref body)) if body.contains("slow down")));

        let (endpoint, _server) = serve_once(401, r#"{"error":"bad key"}"#).await;
        let result = stub_client(endpoint, None).complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::Unauthorized(_))));

        let (endpoint, _server) = serve_once(403, r#"{"error":"no access"}"#).await;
        let result = stub_client(endpoint, None).complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::Unauthorized(_))));

        let (endpoint, _server) = serve_once(500, r#"{"error":"boom"}"#).await;
        let result = stub_client(endpoint, None).complete("sys", "user").await;
        assert!(matches!(result, Err(LlmError::Http(ref msg)) if msg.contains("HTTP 500")));
    }

    #[tokio::test]
    async fn test_blank_answer_through_client_is_cached_as_misc() {
        use crate::config::SuggesterConfig;
        use crate::suggest::{
            CacheKey, CategorySuggester, MISC_LABEL, SuggestionRequest, SuggestionSource,
        };

        let (endpoint, _server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#,
        )
        .await;
        let provider: Arc<dyn CompletionProvider> = Arc::new(stub_client(endpoint, None));
        let config = SuggesterConfig {
            min_interval: Duration::ZERO,
            ..Default::default()
        };
        let suggester = CategorySuggester::new(config, Some(provider)).unwrap();

        let result = suggester
            .suggest(SuggestionRequest::new("Mystery Box"))
            .await
            .unwrap();
        assert_eq!(result.label, MISC_LABEL);
        assert_eq!(result.source, SuggestionSource::ExternalProvider);

        // The stub only answers once, so this must come from the cache.
        let again = suggester
            .suggest(SuggestionRequest::new("Mystery Box"))
            .await
            .unwrap();
        assert_eq!(again.source, SuggestionSource::Cache);
        assert_eq!(
            suggester
                .cached(&CacheKey::new("mystery box", None))
                .await
                .as_deref(),
            Some(MISC_LABEL)
        );
    }
}
