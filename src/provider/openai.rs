//! OpenAI backend
//!
//! Speaks the chat-completions wire format. The same codec is shared with
//! the Free backend, since many no-credential servers (Ollama, vLLM,
//! LM Studio) expose the identical API surface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::ChatTurn;
use crate::error::{Error, Result};

use super::ChatBackend;

/// Cap on completion tokens per reply
pub(super) const MAX_COMPLETION_TOKENS: u32 = 2000;
pub(super) const TEMPERATURE: f32 = 0.7;

// ─────────────────────────────────────────────────────────────────
// Wire types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Shared codec
// ─────────────────────────────────────────────────────────────────

/// HTTP client for any server speaking the chat-completions format.
pub(super) struct OpenAiCompat {
    provider: &'static str,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiCompat {
    pub(super) fn new(
        provider: &'static str,
        base_url: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            provider,
            client,
            base_url,
            api_key,
            timeout_secs,
        }
    }

    pub(super) fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Single-attempt chat completion call
    pub(super) async fn chat(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|t| WireMessage {
                    role: t.role.as_str(),
                    content: t.content.clone(),
                })
                .collect(),
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ProviderTimeout {
                    provider: self.provider,
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::provider_request(self.provider, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider_response(
                self.provider,
                format!("status {}: {}", status, body),
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::provider_response(self.provider, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::provider_response(self.provider, "empty completion"))
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// Credentialed backend for the OpenAI API
pub struct OpenAiBackend {
    inner: OpenAiCompat,
}

impl OpenAiBackend {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            inner: OpenAiCompat::new("OpenAI", base_url, api_key, timeout_secs),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn get_response(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        if !self.inner.has_key() {
            return Err(Error::MissingCredential { provider: "OpenAI" });
        }
        self.inner.chat(model, messages).await
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
