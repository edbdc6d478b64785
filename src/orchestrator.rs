//! Message orchestrator
//!
//! Combines persona, history, and provider routing to answer one inbound
//! message: load history, append the user turn, trim, prepend the persona
//! prompt, dispatch, record the assistant turn, reply.
//!
//! The orchestrator is the fail-soft boundary: whatever goes wrong below it,
//! `handle` returns displayable text. The current persona and the provider
//! selection are one shared session context injected at construction;
//! changing either affects all subsequent requests from all users.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::conversation::{ChatTurn, ConversationStore};
use crate::persona::{PersonaRegistry, DEFAULT_PERSONA};
use crate::provider::{ProviderManager, ProviderStatus};

/// Read-only snapshot for the status command
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub provider: ProviderStatus,
    pub persona: String,
    pub active_conversations: usize,
    pub started_at: DateTime<Utc>,
}

/// The bot core: one instance per process, shared by all in-flight requests.
pub struct Orchestrator {
    providers: ProviderManager,
    personas: PersonaRegistry,
    store: ConversationStore,
    current_persona: RwLock<String>,
    admins: HashSet<u64>,
    history_limit: usize,
    trim_window: usize,
    // Serializes same-user requests across the whole handle sequence, so two
    // concurrent messages from one user cannot interleave their history
    // updates. Cross-user requests stay fully concurrent.
    user_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    started_at: DateTime<Utc>,
}

impl Orchestrator {
    pub fn new(config: &BotConfig, providers: ProviderManager) -> Self {
        let personas = PersonaRegistry::new();

        let mut default_persona = config.persona.default_persona.to_lowercase();
        if !personas.is_valid(&default_persona) {
            warn!(
                persona = %default_persona,
                fallback = DEFAULT_PERSONA,
                "Configured default persona is unknown"
            );
            default_persona = DEFAULT_PERSONA.to_string();
        }

        let admins = config.admin.parse_ids();
        info!(
            persona = %default_persona,
            admins = admins.len(),
            history_limit = config.conversation.history_limit,
            trim_window = config.conversation.trim_window,
            "Orchestrator initialized"
        );

        Self {
            providers,
            personas,
            store: ConversationStore::new(),
            current_persona: RwLock::new(default_persona),
            admins,
            history_limit: config.conversation.history_limit,
            trim_window: config.conversation.trim_window,
            user_locks: Mutex::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    fn user_lock(&self, user_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks.lock().entry(user_id).or_default().clone()
    }

    /// Answer one inbound message for a user.
    ///
    /// Always returns non-empty displayable text; provider failures are
    /// rendered into notice text and recorded as the assistant turn so
    /// failed exchanges stay visible in the history.
    pub async fn handle(&self, user_id: u64, text: &str) -> String {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.store.append(user_id, ChatTurn::user(text));
        self.store
            .trim(user_id, self.history_limit, self.trim_window);

        let persona = self.current_persona.read().clone();
        let prompt = self.personas.resolve(&persona);

        let mut messages = Vec::with_capacity(self.store.len(user_id) + 1);
        messages.push(ChatTurn::system(prompt));
        messages.extend(self.store.get(user_id));

        let response = match self.providers.get_response(&messages).await {
            Ok(reply) => reply,
            Err(e) if e.is_soft() => {
                warn!(user_id, error = %e, "Provider call degraded to notice text");
                e.user_notice()
            }
            Err(e) => {
                // Outer safety net: nothing below the orchestrator may
                // surface to the transport layer as a failure.
                error!(user_id, error = %e, "Unexpected error while handling message");
                e.user_notice()
            }
        };

        self.store.append(user_id, ChatTurn::assistant(response.clone()));
        response
    }

    /// Switch the process-wide persona.
    ///
    /// Validity check only. There is deliberately no admin check here;
    /// gating restricted personas is the command layer's job via
    /// [`PersonaRegistry::can_use`].
    pub fn set_persona(&self, name: &str) -> bool {
        if !self.personas.is_valid(name) {
            return false;
        }

        let canonical = name.to_lowercase();
        info!(persona = %canonical, "Persona changed");
        *self.current_persona.write() = canonical;
        true
    }

    /// The currently active persona name
    pub fn current_persona(&self) -> String {
        self.current_persona.read().clone()
    }

    /// Delete a user's conversation history (idempotent)
    pub fn clear_conversation(&self, user_id: u64) {
        self.store.clear(user_id);
        info!(user_id, "Conversation cleared");
    }

    /// Pure allow-list membership check
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Persona catalog, for the command layer's listings and access checks
    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    /// Provider manager, for the command layer's provider/model switches
    pub fn providers(&self) -> &ProviderManager {
        &self.providers
    }

    /// Conversation store, read-only uses (tests, diagnostics)
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Snapshot for the status command
    pub fn status(&self) -> BotStatus {
        BotStatus {
            provider: self.providers.status(),
            persona: self.current_persona(),
            active_conversations: self.store.user_count(),
            started_at: self.started_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatBackend, MockBackend, ProviderKind};

    fn orchestrator_with(backend: MockBackend) -> Orchestrator {
        orchestrator_with_config(backend, BotConfig::default())
    }

    fn orchestrator_with_config(backend: MockBackend, config: BotConfig) -> Orchestrator {
        let mut backends: HashMap<ProviderKind, Box<dyn ChatBackend>> = HashMap::new();
        backends.insert(ProviderKind::Free, Box::new(backend));
        let providers = ProviderManager::with_backends(backends, vec![ProviderKind::Free]);
        Orchestrator::new(&config, providers)
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let orchestrator = orchestrator_with(MockBackend::echo("echo:"));

        let reply = orchestrator.handle(42, "hello").await;
        assert_eq!(reply, "echo:hello");

        // User turn and assistant turn recorded; system turn never stored
        let history = orchestrator.store().get(42);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatTurn::user("hello"));
        assert_eq!(history[1], ChatTurn::assistant("echo:hello"));
    }

    #[tokio::test]
    async fn test_trim_scenario_eleven_messages() {
        // hard limit 20, trim window 8: after the 11th exchange the history
        // holds at most 8 pre-call turns plus the new assistant turn.
        let orchestrator = orchestrator_with(MockBackend::echo("echo:"));

        for i in 1..=11 {
            orchestrator.handle(42, &format!("message-{}", i)).await;
        }

        let history = orchestrator.store().get(42);
        assert!(history.len() <= 16, "history length {} > 16", history.len());
        assert_eq!(history.last().unwrap().content, "echo:message-11");
    }

    #[tokio::test]
    async fn test_fail_soft_round_trip() {
        let orchestrator = orchestrator_with(MockBackend::failing());

        let reply = orchestrator.handle(42, "hello").await;

        // Never empty, never a panic or an Err surface
        assert!(!reply.is_empty());

        // The notice is recorded as the assistant turn for debuggability
        let history = orchestrator.store().get(42);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, reply);
    }

    #[tokio::test]
    async fn test_set_persona_validity_only() {
        let orchestrator = orchestrator_with(MockBackend::new());

        // Restricted persona: the primitive succeeds without any admin
        // check; gating lives in the command layer.
        assert!(orchestrator.set_persona("jailbreak"));
        assert_eq!(orchestrator.current_persona(), "jailbreak");

        // Unknown persona: rejected, state unchanged
        assert!(!orchestrator.set_persona("totally-unknown-xyz"));
        assert_eq!(orchestrator.current_persona(), "jailbreak");

        // Case-insensitive
        assert!(orchestrator.set_persona("TEACHER"));
        assert_eq!(orchestrator.current_persona(), "teacher");
    }

    #[tokio::test]
    async fn test_unknown_default_persona_falls_back() {
        let mut config = BotConfig::default();
        config.persona.default_persona = "nonexistent".to_string();

        let orchestrator = orchestrator_with_config(MockBackend::new(), config);
        assert_eq!(orchestrator.current_persona(), DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn test_clear_conversation_idempotent() {
        let orchestrator = orchestrator_with(MockBackend::new());

        orchestrator.handle(7, "hi").await;
        assert!(orchestrator.store().contains(7));

        orchestrator.clear_conversation(7);
        assert!(!orchestrator.store().contains(7));

        // Second clear and never-seen user: no-ops
        orchestrator.clear_conversation(7);
        orchestrator.clear_conversation(12345);
    }

    #[tokio::test]
    async fn test_is_admin_membership() {
        let mut config = BotConfig::default();
        config.admin.user_ids = "42, 7".to_string();

        let orchestrator = orchestrator_with_config(MockBackend::new(), config);
        assert!(orchestrator.is_admin(42));
        assert!(orchestrator.is_admin(7));
        assert!(!orchestrator.is_admin(1));
    }

    #[tokio::test]
    async fn test_concurrent_same_user_messages_serialize() {
        let orchestrator = Arc::new(orchestrator_with(MockBackend::echo("echo:")));

        let a = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.handle(42, "first").await })
        };
        let b = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.handle(42, "second").await })
        };

        a.await.unwrap();
        b.await.unwrap();

        // Both exchanges landed fully: two user/assistant pairs, and every
        // assistant turn directly follows its user turn.
        let history = orchestrator.store().get(42);
        assert_eq!(history.len(), 4);
        for pair in history.chunks(2) {
            assert_eq!(pair[1].content, format!("echo:{}", pair[0].content));
        }
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let orchestrator = orchestrator_with(MockBackend::new());
        orchestrator.handle(1, "hi").await;

        let status = orchestrator.status();
        assert_eq!(status.persona, "helpful");
        assert_eq!(status.provider.current_provider, "Free");
        assert_eq!(status.active_conversations, 1);
    }
}
