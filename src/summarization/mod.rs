//! Abstractive summarization providers.
//!
//! The summarization pipeline is optional; when no provider is configured the processing layer
//! produces deterministic extractive summaries instead. Two HTTP-backed providers are supported:
//! a local Ollama runtime and the hosted Gemini generative API. Provider calls are wrapped in a
//! [`RetryPolicy`] with linear backoff so transient failures do not immediately degrade the
//! pipeline.

use std::time::Duration;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const USER_AGENT: &str = "docsift/summary";

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the processing pipeline.
    pub prompt: String,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a concise summary using the configured model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build a summarization client based on configuration.
///
/// Returns `Ok(None)` when the provider is `none`, leaving the pipeline extractive.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Option<Box<dyn SummarizationClient>>, SummarizationClientError> {
    match config.summarization_provider {
        SummarizationProvider::None => Ok(None),
        SummarizationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Some(Box::new(OllamaSummarizationClient::new(base_url)?)))
        }
        SummarizationProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                SummarizationClientError::ProviderUnavailable("GEMINI_API_KEY is not set".into())
            })?;
            let base_url = config
                .gemini_api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());
            Ok(Some(Box::new(GeminiSummarizationClient::new(
                base_url, api_key,
            )?)))
        }
    }
}

fn http_client() -> Result<Client, SummarizationClientError> {
    Client::builder().user_agent(USER_AGENT).build().map_err(|error| {
        SummarizationClientError::ProviderUnavailable(format!(
            "failed to construct HTTP client: {error}"
        ))
    })
}

/// Backoff schedule applied to each provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Extra delay added per failed attempt.
    pub step: Duration,
}

impl RetryPolicy {
    /// Policy with the default one second base delay growing by two seconds per attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            step: Duration::from_secs(2),
        }
    }

    /// Policy that retries without sleeping.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
        }
    }

    /// Delay applied after the zero-based `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay + self.step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Call the provider up to `max_retries + 1` times, sleeping between failed attempts.
///
/// Returns the last error once every attempt has failed.
pub async fn generate_with_retry(
    client: &dyn SummarizationClient,
    request: &SummarizationRequest,
    policy: &RetryPolicy,
) -> Result<String, SummarizationClientError> {
    let mut attempt = 0;
    loop {
        match client.generate_summary(request.clone()).await {
            Ok(summary) => return Ok(summary),
            Err(error) if attempt < policy.max_retries => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    model = %request.model,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "Summarization call failed; retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    model = %request.model,
                    %error,
                    "Summarization call failed; retries exhausted"
                );
                return Err(error);
            }
        }
    }
}

/// Client for a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Create a client targeting `base_url`.
    pub fn new(base_url: String) -> Result<Self, SummarizationClientError> {
        Ok(Self {
            http: http_client()?,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Client for the hosted Gemini `generateContent` endpoint.
pub struct GeminiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiSummarizationClient {
    /// Create a client targeting `base_url`, authenticating with `api_key`.
    pub fn new(base_url: String, api_key: String) -> Result<Self, SummarizationClientError> {
        Ok(Self {
            http: http_client()?,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[async_trait]
impl SummarizationClient for GeminiSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": request.prompt } ] }
            ]
        });
        let endpoint = self.endpoint(&request.model);

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GeminiResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        body.into_text().ok_or_else(|| {
            SummarizationClientError::InvalidResponse("Gemini response contained no text".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            model: "llama".into(),
            prompt: "Summarize".into(),
        }
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{"model":"llama","stream":false}"#);
                then.status(200).json_body(json!({
                    "response": "  Summary text\n",
                    "done": true
                }));
            })
            .await;

        let summary = client.generate_summary(request()).await.expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_summary(request())
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn gemini_client_sends_key_and_joins_parts() {
        let server = MockServer::start_async().await;
        let client = GeminiSummarizationClient::new(server.base_url(), "secret".into())
            .expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-flash:generateContent")
                    .header("x-goog-api-key", "secret");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [ { "text": "First half. " }, { "text": "Second half." } ] }
                    }]
                }));
            })
            .await;

        let summary = client
            .generate_summary(SummarizationRequest {
                model: "gemini-2.5-flash".into(),
                prompt: "Summarize".into(),
            })
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "First half. Second half.");
    }

    #[tokio::test]
    async fn gemini_client_rejects_empty_candidates() {
        let server = MockServer::start_async().await;
        let client = GeminiSummarizationClient::new(server.base_url(), "secret".into())
            .expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-flash:generateContent");
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let error = client
            .generate_summary(SummarizationRequest {
                model: "gemini-2.5-flash".into(),
                prompt: "Summarize".into(),
            })
            .await
            .expect_err("empty response");

        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }

    struct FlakyClient {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SummarizationClient for FlakyClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(SummarizationClientError::GenerationFailed("flaky".into()))
            } else {
                Ok("recovered".into())
            }
        }
    }

    #[tokio::test]
    async fn retry_recovers_within_budget() {
        let client = FlakyClient {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        };

        let summary = generate_with_retry(&client, &request(), &RetryPolicy::immediate(2))
            .await
            .expect("summary after retries");

        assert_eq!(summary, "recovered");
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_retries() {
        let client = FlakyClient {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
        };

        let error = generate_with_retry(&client, &request(), &RetryPolicy::immediate(2))
            .await
            .expect_err("retries exhausted");

        assert!(matches!(error, SummarizationClientError::GenerationFailed(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn default_policy_backs_off_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(3));
    }

    #[test]
    fn no_client_for_extractive_provider() {
        let config = Config::default();
        assert!(build_summarization_client(&config).expect("build").is_none());
    }
}
