use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::generator::{parse_candidates, CandidateGenerator, GenerationFailure, GenerationResult};
use crate::config::SuggestionsConfig;

const SYSTEM_PROMPT: &str = "You help property managers set up utility service for a home. \
You only answer with JSON and never invent providers that do not operate in the requested area.";

/// Candidate generator backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAiCandidateGenerator {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCandidateGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Point at a proxy or compatible gateway.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// `None` when no API key is configured; callers then run on fallback data.
    pub fn from_config(config: &SuggestionsConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref()?;
        Some(Self::new(api_key, config.model.clone()).with_base_url(config.base_url.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let start = std::time::Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "candidate generation request failed");
                GenerationFailure::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "candidate generation API error");
            return Err(GenerationFailure::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationFailure::Malformed(err.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "candidate generation completed"
        );

        completion.into_content()
    }
}

impl std::fmt::Debug for OpenAiCandidateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCandidateGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CandidateGenerator for OpenAiCandidateGenerator {
    async fn generate(&self, prompt: &str) -> GenerationResult {
        match self.complete(prompt).await {
            Ok(content) => parse_candidates(&content),
            Err(failure) => GenerationResult::Failed(failure),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String, GenerationFailure> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationFailure::Malformed("completion had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_base_url() {
        let generator =
            OpenAiCandidateGenerator::new("sk-test", "gpt-4o-mini").with_base_url("http://localhost:8080/v1/");
        assert_eq!(generator.base_url(), "http://localhost:8080/v1");
        assert_eq!(generator.model(), "gpt-4o-mini");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let generator = OpenAiCandidateGenerator::new("sk-secret", "gpt-4o-mini");
        assert!(!format!("{generator:?}").contains("sk-secret"));
    }

    #[test]
    fn empty_completion_is_malformed() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).expect("parse");
        assert!(matches!(
            response.into_content(),
            Err(GenerationFailure::Malformed(_))
        ));

        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parse");
        assert!(response.into_content().is_err());
    }
}
