//! Free backend
//!
//! No-credential fallback that is always available regardless of
//! configuration. Points at any OpenAI-compatible server (a local Ollama by
//! default) and sends no Authorization header.

use async_trait::async_trait;

use crate::conversation::ChatTurn;
use crate::error::Result;

use super::openai::OpenAiCompat;
use super::ChatBackend;

/// Always-available backend over an OpenAI-compatible endpoint
pub struct FreeBackend {
    inner: OpenAiCompat,
}

impl FreeBackend {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            inner: OpenAiCompat::new("Free", base_url, None, timeout_secs),
        }
    }
}

#[async_trait]
impl ChatBackend for FreeBackend {
    fn name(&self) -> &'static str {
        "Free"
    }

    async fn get_response(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        // No credential gate: availability is unconditional, the call itself
        // can still fail softly if the endpoint is unreachable.
        self.inner.chat(model, messages).await
    }
}
