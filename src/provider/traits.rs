//! Backend trait definition
//!
//! Every provider adapter implements [`ChatBackend`]; the manager dispatches
//! to the adapter for the currently selected provider kind. The trait is
//! object-safe for dynamic dispatch.

use async_trait::async_trait;

use crate::conversation::{ChatTurn, Role};
use crate::error::Result;

/// Uniform interface over heterogeneous chat providers.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Stable provider name used in logs and user notices
    fn name(&self) -> &'static str;

    /// Exchange an ordered message list for a reply.
    ///
    /// One attempt per call, no retries. Failures come back as typed errors;
    /// the orchestrator renders them into notice text so the transport layer
    /// never sees an exception.
    async fn get_response(&self, model: &str, messages: &[ChatTurn]) -> Result<String>;
}

/// Flatten a message list into a single "Role: content" transcript string.
///
/// Used by backends whose wire format takes one prompt string rather than a
/// structured message list.
pub fn flatten_transcript(messages: &[ChatTurn]) -> String {
    let parts: Vec<String> = messages
        .iter()
        .map(|turn| {
            let label = match turn.role {
                Role::System => "System",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", label, turn.content)
        })
        .collect();

    parts.join("\n\n")
}
