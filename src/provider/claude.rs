//! Claude backend
//!
//! Speaks the Anthropic messages format. Unlike the chat-completions style,
//! the system prompt travels in a dedicated top-level field, so it is
//! extracted from the uniform message list before dispatch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::{ChatTurn, Role};
use crate::error::{Error, Result};

use super::openai::MAX_COMPLETION_TOKENS;
use super::ChatBackend;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────
// Wire types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Claude Backend
// ─────────────────────────────────────────────────────────────────

/// Credentialed backend for the Anthropic API
pub struct ClaudeBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl ClaudeBackend {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
            timeout_secs,
        }
    }

    /// Split the uniform message list into the Anthropic shape: the last
    /// system turn becomes the `system` field, everything else stays in
    /// timeline order.
    fn convert(messages: &[ChatTurn]) -> (Option<String>, Vec<WireMessage>) {
        let mut system = None;
        let mut wire = Vec::with_capacity(messages.len());

        for turn in messages {
            match turn.role {
                Role::System => system = Some(turn.content.clone()),
                Role::User | Role::Assistant => wire.push(WireMessage {
                    role: turn.role.as_str(),
                    content: turn.content.clone(),
                }),
            }
        }

        (system, wire)
    }
}

#[async_trait]
impl ChatBackend for ClaudeBackend {
    fn name(&self) -> &'static str {
        "Claude"
    }

    async fn get_response(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(Error::MissingCredential { provider: "Claude" })?;

        let (system, wire_messages) = Self::convert(messages);
        let body = MessagesRequest {
            model: model.to_string(),
            max_tokens: MAX_COMPLETION_TOKENS,
            system,
            messages: wire_messages,
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderTimeout {
                        provider: "Claude",
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    Error::provider_request("Claude", e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider_response(
                "Claude",
                format!("status {}: {}", status, body),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::provider_response("Claude", e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::provider_response("Claude", "no text block in response"))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
