//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use cipher_core::config::InferenceConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};
use crate::provider::InferenceService;

/// Returned when the response carries no candidate text.
pub const EMPTY_RESPONSE_TEXT: &str = "Could not generate content.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

pub struct GeminiInference {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiInference {
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = InferenceConfig::default();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: defaults.api_base,
            model: defaults.model,
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &InferenceConfig) -> Option<Self> {
        let key = config.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some(
            Self::new(key)
                .with_base_url(&config.api_base)
                .with_model(&config.model),
        )
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl InferenceService for GeminiInference {
    async fn complete(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: system_instruction,
                }],
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        log::debug!("Gemini request to model {}", self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body
            .first_text()
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/test-model:generateContent";

    fn client(server: &MockServer) -> GeminiInference {
        GeminiInference::new("k-123")
            .with_base_url(server.uri())
            .with_model("test-model")
    }

    #[tokio::test]
    async fn sends_prompt_and_system_instruction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(query_param("key", "k-123"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "explain this"}]}],
                "systemInstruction": {"parts": [{"text": "be brief"}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "It prints hi."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).complete("explain this", "be brief").await.unwrap();
        assert_eq!(text, "It prints hi.");
    }

    #[tokio::test]
    async fn missing_candidates_yield_default_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let text = client(&server).complete("p", "s").await.unwrap();
        assert_eq!(text, EMPTY_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(&server).complete("p", "s").await.unwrap_err();
        match err {
            InferenceError::Api(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn from_config_requires_an_api_key() {
        let mut config = InferenceConfig::default();
        assert!(GeminiInference::from_config(&config).is_none());
        config.api_key = Some("k".to_string());
        config.model = "m".to_string();
        let client = GeminiInference::from_config(&config).unwrap();
        assert_eq!(client.model(), "m");
    }
}
