//! Minimal client for OpenAI-compatible chat completion endpoints.

use std::time::Duration;

use oppdb_core::{AppConfig, ConfigError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::EnrichmentError;
use crate::normalize::parse_reply;
use crate::retry::retry_with_backoff;
use crate::types::AnalysisKind;

const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat-completions client that asks for JSON-object replies.
///
/// Use [`LlmClient::from_app_config`] in production; tests point
/// [`LlmClient::new`] at a wiremock server.
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns [`EnrichmentError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("oppdb/0.1 (enrichment)")
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            max_retries,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Build a client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::Config`] if no API key is configured, or
    /// [`EnrichmentError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, EnrichmentError> {
        let api_key = config
            .llm_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("OPPDB_LLM_API_KEY".to_string()))?;
        Self::new(
            &config.llm_api_url,
            api_key,
            &config.llm_model,
            config.llm_timeout_secs,
            config.llm_max_retries,
        )
    }

    #[must_use]
    pub fn with_backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user exchange and parse the reply as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::LlmStatus`] for non-2xx replies (after
    /// retries for transient ones), [`EnrichmentError::Llm`] for a malformed
    /// envelope, or [`EnrichmentError::Normalization`] if the content is not a
    /// JSON object.
    pub async fn complete_json(
        &self,
        kind: AnalysisKind,
        system: &str,
        user: &str,
    ) -> Result<Value, EnrichmentError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let content =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || self.send_once(&body))
                .await?;

        tracing::debug!(kind = %kind, model = %self.model, chars = content.len(), "LLM reply received");
        parse_reply(kind, &content)
    }

    async fn send_once(&self, body: &Value) -> Result<String, EnrichmentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::LlmStatus {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Llm(format!("response parse error: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| EnrichmentError::Llm("reply contained no content".to_string()))
    }
}
