//! Conversation turns and the per-user bounded history store.
//!
//! Histories are in-memory only and live until an explicit reset or process
//! exit. The system prompt is never stored; it is prepended at call time.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────
// Turn Types
// ─────────────────────────────────────────────────────────────────

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire-format name used by the chat-completion style APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Conversation Store
// ─────────────────────────────────────────────────────────────────

/// Per-user conversation histories, keyed by Discord user id.
///
/// Mutation is keyed by user id; cross-user calls never interfere. Each
/// operation takes the lock once, so an append-then-trim pair observes a
/// consistent length.
pub struct ConversationStore {
    histories: RwLock<HashMap<u64, Vec<ChatTurn>>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Append a turn to a user's history, creating the history if absent
    pub fn append(&self, user_id: u64, turn: ChatTurn) {
        let mut histories = self.histories.write();
        histories.entry(user_id).or_default().push(turn);
    }

    /// Drop older context once a history outgrows `hard_limit`.
    ///
    /// When the stored length exceeds `hard_limit`, the history is replaced
    /// by its most recent `keep_last` turns. The discarded turns are gone
    /// for good; this is a lossy truncation, not a sliding merge.
    pub fn trim(&self, user_id: u64, hard_limit: usize, keep_last: usize) {
        let mut histories = self.histories.write();
        if let Some(history) = histories.get_mut(&user_id) {
            if history.len() > hard_limit {
                let dropped = history.len().saturating_sub(keep_last);
                *history = history.split_off(dropped);
                debug!(user_id, dropped, kept = history.len(), "Trimmed conversation history");
            }
        }
    }

    /// Delete a user's history. Clearing an absent user is a no-op.
    pub fn clear(&self, user_id: u64) {
        let mut histories = self.histories.write();
        if histories.remove(&user_id).is_some() {
            debug!(user_id, "Cleared conversation history");
        }
    }

    /// Get a snapshot of a user's history (empty if absent)
    pub fn get(&self, user_id: u64) -> Vec<ChatTurn> {
        self.histories
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of stored turns for a user
    pub fn len(&self, user_id: u64) -> usize {
        self.histories
            .read()
            .get(&user_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Whether a user currently has any stored history
    pub fn contains(&self, user_id: u64) -> bool {
        self.histories.read().contains_key(&user_id)
    }

    /// Number of users with live histories
    pub fn user_count(&self) -> usize {
        self.histories.read().len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
