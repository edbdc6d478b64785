//! Grok backend stub
//!
//! The Grok adapter is not implemented. It deliberately delegates every call
//! to the Free backend rather than erroring, so selecting Grok still yields
//! answers. The delegation is logged on every call.

use async_trait::async_trait;
use tracing::warn;

use crate::conversation::ChatTurn;
use crate::error::Result;

use super::free::FreeBackend;
use super::ChatBackend;

/// Stub backend that answers through the Free backend
pub struct GrokBackend {
    fallback: FreeBackend,
    fallback_model: String,
}

impl GrokBackend {
    /// `fallback_model` is the Free catalog's default model; Grok model
    /// names mean nothing to the fallback endpoint.
    pub fn new(fallback: FreeBackend, fallback_model: String) -> Self {
        Self {
            fallback,
            fallback_model,
        }
    }
}

#[async_trait]
impl ChatBackend for GrokBackend {
    fn name(&self) -> &'static str {
        "Grok"
    }

    async fn get_response(&self, _model: &str, messages: &[ChatTurn]) -> Result<String> {
        warn!("Grok provider not fully implemented, using Free provider");
        self.fallback
            .get_response(&self.fallback_model, messages)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name() {
        let backend = GrokBackend::new(
            FreeBackend::new("http://localhost:11434/v1".to_string(), 120),
            "gpt-3.5-turbo".to_string(),
        );
        assert_eq!(backend.name(), "Grok");
    }

    #[tokio::test]
    async fn test_delegates_to_fallback() {
        // The stub must answer via the fallback endpoint; with an unreachable
        // one the error comes from the Free backend, not from Grok itself.
        let backend = GrokBackend::new(
            FreeBackend::new("http://127.0.0.1:9/v1".to_string(), 1),
            "gpt-3.5-turbo".to_string(),
        );

        let err = backend
            .get_response("grok-beta", &[ChatTurn::user("hi")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Free"));
    }
}
