//! HTTP client for the LLM-backed providers
//!
//! Speaks the Anthropic messages API or any OpenAI-compatible chat API
//! (DeepSeek, etc); the wire format is picked from the URL.

use crate::core::config::{LlmConfig, ProviderRole};
use crate::core::error::{Result, SimError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    pub fn detect(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    fn body(self, model: &str, max_tokens: u32, system: &str, user: &str) -> Value {
        match self {
            ApiFormat::Anthropic => json!({
                "model": model,
                "max_tokens": max_tokens,
                "system": system,
                "messages": [{ "role": "user", "content": user }]
            }),
            ApiFormat::OpenAI => json!({
                "model": model,
                "max_tokens": max_tokens,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user }
                ]
            }),
        }
    }

    fn authorize(self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        match self {
            ApiFormat::Anthropic => request
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ApiFormat::OpenAI => request.bearer_auth(api_key),
        }
    }

    /// Reply text from a successful response body
    fn reply_text(self, body: &Value) -> Option<String> {
        let text = match self {
            ApiFormat::Anthropic => body["content"]
                .as_array()?
                .iter()
                .filter_map(|block| block["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            ApiFormat::OpenAI => body["choices"][0]["message"]["content"].as_str()?.to_string(),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Map a failed HTTP status to an error kind
///
/// Rate limits and server errors are `Llm` (retried by the caller's policy);
/// other client errors mean the request itself is wrong and are `Config`.
fn status_error(status: StatusCode, body: &str) -> SimError {
    let detail = format!("API error {}: {}", status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        SimError::Llm(detail)
    } else {
        SimError::Config(detail)
    }
}

pub struct LlmClient {
    http: Client,
    api_key: String,
    api_url: String,
    model: String,
    format: ApiFormat,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            format: ApiFormat::detect(&api_url),
            api_key,
            api_url,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Client for one provider role, using that role's model override if set
    pub fn for_role(config: &LlmConfig, role: ProviderRole) -> Self {
        Self::new(
            config.api_key.clone(),
            config.api_url.clone(),
            config.model_for(role).to_string(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn format(&self) -> ApiFormat {
        self.format
    }

    /// Send one system + user exchange and return the reply text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_chars = user.len(), "llm request");

        let body = self.format.body(&self.model, self.max_tokens, system, user);
        let request = self.format.authorize(self.http.post(&self.api_url), &self.api_key);
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| SimError::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.model, %status, "llm request rejected");
            return Err(status_error(status, &text));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| SimError::Llm(format!("unreadable response: {}", e)))?;
        let text = self
            .format
            .reply_text(&reply)
            .ok_or_else(|| SimError::Llm("Empty response".into()))?;

        tracing::trace!(model = %self.model, reply = %text, "llm reply");
        Ok(text)
    }
}
