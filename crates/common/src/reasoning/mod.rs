//! Reasoning model abstraction
//!
//! A single-shot `complete(prompt) -> text` capability. No conversation state
//! is kept between calls. Providers:
//! - Gemini (`generateContent` REST API)
//! - OpenAI-compatible chat completions
//! - A fixed-response mock

use crate::config::ReasoningConfig;
use crate::errors::{AppError, Capability, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for the hosted reasoning capability
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt, receive the raw response text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn require_key(config: &ReasoningConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| AppError::Configuration {
        message: format!("reasoning provider '{}' requires an api key", config.provider),
    })
}

fn finish_call(start: Instant, model: &str, result: &Result<String>) {
    let elapsed = start.elapsed();
    metrics::record_reasoning(elapsed.as_secs_f64(), model, result.is_ok());
    tracing::debug!(
        model,
        latency_ms = elapsed.as_millis() as u64,
        ok = result.is_ok(),
        "Reasoning call finished"
    );
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

impl GeminiClient {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key: require_key(config)?,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| AppError::from_http(Capability::Reasoning, e, self.timeout_ms))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::reasoning(format!("API error {}: {}", status, body)));
            }

            let body: GeminiResponse = response
                .json()
                .await
                .map_err(|e| AppError::from_http(Capability::Reasoning, e, self.timeout_ms))?;

            body.text()
                .map(|t| t.trim().to_string())
                .ok_or_else(|| AppError::reasoning("Response contained no candidates"))
        }
        .await;

        finish_call(start, &self.model, &result);
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChatClient {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key: require_key(config)?,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAIChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| AppError::from_http(Capability::Reasoning, e, self.timeout_ms))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::reasoning(format!("API error {}: {}", status, body)));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| AppError::from_http(Capability::Reasoning, e, self.timeout_ms))?;

            chat.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|t| t.trim().to_string())
                .ok_or_else(|| AppError::reasoning("Empty response from LLM"))
        }
        .await;

        finish_call(start, &self.model, &result);
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock client returning a fixed response, for development without an API key
pub struct MockCompletionClient {
    response: String,
}

impl MockCompletionClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new(
            r#"{"verdict": "Unverifiable", "reasoning": "Mock response - reasoning model not configured."}"#,
        )
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-reasoning"
    }
}

/// Create a completion client based on configuration
pub fn create_completion_client(config: &ReasoningConfig) -> Result<Arc<dyn CompletionClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIChatClient::new(config)?)),
        "mock" => Ok(Arc::new(MockCompletionClient::default())),
        other => Err(AppError::Configuration {
            message: format!("Unknown reasoning provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_response_text_joins_parts() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"verdict\":"},{"text":"\"Real\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().unwrap(), r#"{"verdict":"Real"}"#);
    }

    #[test]
    fn test_gemini_response_without_candidates() {
        let body: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(body.text().is_none());
    }

    #[test]
    fn test_remote_provider_requires_key() {
        let config = ReasoningConfig {
            provider: "gemini".into(),
            api_key: None,
            ..ReasoningConfig::default()
        };
        assert!(matches!(
            create_completion_client(&config),
            Err(AppError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_client_returns_fixed_text() {
        let client = MockCompletionClient::new("hello");
        assert_eq!(client.complete("anything").await.unwrap(), "hello");
        assert_eq!(client.model_name(), "mock-reasoning");
    }
}
