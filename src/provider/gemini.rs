//! Gemini backend
//!
//! The generateContent endpoint takes one prompt string, so the uniform
//! message list is flattened into a "Role: content" transcript before
//! dispatch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::conversation::ChatTurn;
use crate::error::{Error, Result};

use super::traits::flatten_transcript;
use super::ChatBackend;

// ─────────────────────────────────────────────────────────────────
// Wire types (response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Gemini Backend
// ─────────────────────────────────────────────────────────────────

/// Credentialed backend for the Google Gemini API
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl GeminiBackend {
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
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn get_response(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(Error::MissingCredential { provider: "Gemini" })?;

        let prompt = flatten_transcript(messages);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, key
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderTimeout {
                        provider: "Gemini",
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    Error::provider_request("Gemini", e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider_response(
                "Gemini",
                format!("status {}: {}", status, body),
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::provider_response("Gemini", e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|part| part.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::provider_response("Gemini", "no text candidate in response"))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
