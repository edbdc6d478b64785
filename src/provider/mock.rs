//! Mock backend for testing
//!
//! Provides a deterministic ChatBackend implementation for unit tests:
//! fixed replies, echo-the-last-user-turn replies, or simulated failures.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::conversation::{ChatTurn, Role};
use crate::error::{Error, Result};

use super::ChatBackend;

/// Configuration for mock backend behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every call with a provider error
    pub fail: bool,

    /// Fixed response text (takes precedence over echo)
    pub fixed_response: Option<String>,

    /// Echo the last user turn with this prefix
    pub echo_prefix: Option<String>,
}

/// Mock implementation of ChatBackend for testing
pub struct MockBackend {
    config: MockConfig,
    call_count: RwLock<u32>,
}

impl MockBackend {
    /// Create a mock that always answers with a canned string
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            call_count: RwLock::new(0),
        }
    }

    /// Mock that echoes the last user turn with a prefix
    pub fn echo(prefix: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            echo_prefix: Some(prefix.into()),
            ..Default::default()
        })
    }

    /// Mock that answers with a fixed reply
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            fixed_response: Some(reply.into()),
            ..Default::default()
        })
    }

    /// Mock that fails every call
    pub fn failing() -> Self {
        Self::with_config(MockConfig {
            fail: true,
            ..Default::default()
        })
    }

    /// Number of get_response calls so far
    pub fn call_count(&self) -> u32 {
        *self.call_count.read()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn get_response(&self, _model: &str, messages: &[ChatTurn]) -> Result<String> {
        *self.call_count.write() += 1;

        if self.config.fail {
            return Err(Error::provider_request("Mock", "simulated failure"));
        }

        if let Some(ref fixed) = self.config.fixed_response {
            return Ok(fixed.clone());
        }

        if let Some(ref prefix) = self.config.echo_prefix {
            let last_user = messages
                .iter()
                .rev()
                .find(|t| t.role == Role::User)
                .map(|t| t.content.as_str())
                .unwrap_or("");
            return Ok(format!("{}{}", prefix, last_user));
        }

        Ok("mock response".to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
