use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{LlmProvider, LlmRequest, ProviderError};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Select a provider by configured name. API keys come from the
/// environment: `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`.
pub fn provider_for(name: &str, timeout: Duration) -> Result<Box<dyn LlmProvider>> {
    match name {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is not set but model_provider is openai")?;
            Ok(Box::new(OpenAiProvider::new(api_key, timeout)))
        }
        "anthropic" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY is not set but model_provider is anthropic")?;
            Ok(Box::new(AnthropicProvider::new(api_key, timeout)))
        }
        other => bail!("unknown model provider: {other}"),
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status.as_u16() == 429 || status.is_server_error() {
        ProviderError::Transient(format!("provider returned {status}: {body}"))
    } else {
        ProviderError::Terminal(format!("provider returned {status}: {body}"))
    }
}

pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize, Serialize)]
struct OpenAiMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete_text(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        let model = request
            .model_hint
            .as_deref()
            .unwrap_or(OPENAI_DEFAULT_MODEL);

        let body = json!({
            "model": model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });

        debug!(model, "dispatching openai completion");

        let response = self
            .http_client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transient(format!("openai request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transient(format!("openai response parse failed: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Transient("openai response had no choices".to_string()))
    }
}

pub struct AnthropicProvider {
    http_client: Client,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete_text(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        let model = request
            .model_hint
            .as_deref()
            .unwrap_or(ANTHROPIC_DEFAULT_MODEL);

        let body = json!({
            "model": model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.user },
            ],
        });

        debug!(model, "dispatching anthropic completion");

        let response = self
            .http_client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transient(format!("anthropic request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|err| {
            ProviderError::Transient(format!("anthropic response parse failed: {err}"))
        })?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::Transient(
                "anthropic response had no text blocks".to_string(),
            ));
        }

        Ok(text)
    }
}
