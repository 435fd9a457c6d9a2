/// Upstream text generation providers
///
/// The gateway only needs `generate(prompt) -> text`. [`Generator`] is that
/// seam; [`GeminiClient`] implements it against Google's Generative Language
/// REST API (`models/{model}:generateContent`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default Generative Language API base URL
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generated text and the token usage reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,

    /// Total tokens, if the provider reports them
    pub tokens_used: Option<i64>,
}

/// Provider failure; the message is shown to the caller
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct GenerateError(pub String);

/// Capability to turn a prompt into text
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerateError>;
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    total_token_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

impl GeminiResponse {
    fn into_generation(self) -> Result<Generation, GenerateError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerateError("Model returned no text".to_string()));
        }

        Ok(Generation {
            text,
            tokens_used: self.usage_metadata.and_then(|u| u.total_token_count),
        })
    }
}

/// Google Gemini client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client with a 60 second request timeout
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GenerateError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(api_key, model, base_url, client))
    }

    pub fn with_client(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerateError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerateError(format!("Gemini API error ({}): {}", status, body)));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerateError(format!("Invalid Gemini response: {}", e)))?;

        parsed.into_generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_parse_response_with_usage() {
        let raw = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}],
            "usageMetadata": {"promptTokenCount": 3, "totalTokenCount": 12}
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let generation = parsed.into_generation().unwrap();

        assert_eq!(generation.text, "Hello there");
        assert_eq!(generation.tokens_used, Some(12));
    }

    #[test]
    fn test_parse_response_without_usage() {
        let raw = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.into_generation().unwrap().tokens_used, None);
    }

    #[test]
    fn test_parse_empty_response_is_error() {
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.into_generation().is_err());
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("secret-key-123", "gemini-1.5-flash", "https://example.test/v1beta/")
            .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!format!("{:?}", client).contains("secret-key-123"));
    }
}
