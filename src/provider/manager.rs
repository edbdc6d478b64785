//! Provider manager
//!
//! Owns the model catalog, tracks which provider kinds are usable, and
//! dispatches chat calls to the adapter for the current selection.
//!
//! Availability is credential-gated, not health-checked: a provider is
//! "available" because its key was present at startup. A call can therefore
//! still fail at dispatch time (expired key, network trouble); that failure
//! is soft and never revokes availability.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::ProviderSettings;
use crate::conversation::ChatTurn;
use crate::error::{Error, Result};

use super::claude::ClaudeBackend;
use super::free::FreeBackend;
use super::gemini::GeminiBackend;
use super::grok::GrokBackend;
use super::openai::OpenAiBackend;
use super::ChatBackend;

// ─────────────────────────────────────────────────────────────────
// Provider Kind
// ─────────────────────────────────────────────────────────────────

/// The supported provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// No-credential fallback, always available
    Free,
    /// OpenAI API
    OpenAi,
    /// Anthropic API
    Claude,
    /// Google Gemini API
    Gemini,
    /// Grok (stub adapter, delegates to Free)
    Grok,
}

impl ProviderKind {
    /// All provider kinds, Free first
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Free,
            ProviderKind::OpenAi,
            ProviderKind::Claude,
            ProviderKind::Gemini,
            ProviderKind::Grok,
        ]
    }

    /// Display name used in status output and notices
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Free => "Free",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Grok => "Grok",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(ProviderKind::Free),
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            "grok" => Ok(ProviderKind::Grok),
            _ => Err(format!(
                "Unknown provider '{}'. Valid: free, openai, claude, gemini, grok",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Model Catalog
// ─────────────────────────────────────────────────────────────────

/// A model a provider exposes. Cost is informational only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub kind: ProviderKind,
    pub max_tokens: u32,
    pub cost_per_token: f64,
}

const FREE_MODELS: &[ModelInfo] = &[ModelInfo {
    name: "gpt-3.5-turbo",
    kind: ProviderKind::Free,
    max_tokens: 4096,
    cost_per_token: 0.0,
}];

const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "gpt-3.5-turbo",
        kind: ProviderKind::OpenAi,
        max_tokens: 4096,
        cost_per_token: 0.002,
    },
    ModelInfo {
        name: "gpt-4",
        kind: ProviderKind::OpenAi,
        max_tokens: 8192,
        cost_per_token: 0.03,
    },
    ModelInfo {
        name: "gpt-4-turbo",
        kind: ProviderKind::OpenAi,
        max_tokens: 128_000,
        cost_per_token: 0.01,
    },
];

const CLAUDE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "claude-3-haiku",
        kind: ProviderKind::Claude,
        max_tokens: 200_000,
        cost_per_token: 0.0025,
    },
    ModelInfo {
        name: "claude-3-sonnet",
        kind: ProviderKind::Claude,
        max_tokens: 200_000,
        cost_per_token: 0.015,
    },
    ModelInfo {
        name: "claude-3-opus",
        kind: ProviderKind::Claude,
        max_tokens: 200_000,
        cost_per_token: 0.075,
    },
];

const GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "gemini-pro",
        kind: ProviderKind::Gemini,
        max_tokens: 32_768,
        cost_per_token: 0.0005,
    },
    ModelInfo {
        name: "gemini-pro-vision",
        kind: ProviderKind::Gemini,
        max_tokens: 16_384,
        cost_per_token: 0.0025,
    },
];

const GROK_MODELS: &[ModelInfo] = &[ModelInfo {
    name: "grok-beta",
    kind: ProviderKind::Grok,
    max_tokens: 25_000,
    cost_per_token: 0.01,
}];

/// The models a provider kind exposes, default first
pub fn models_for(kind: ProviderKind) -> &'static [ModelInfo] {
    match kind {
        ProviderKind::Free => FREE_MODELS,
        ProviderKind::OpenAi => OPENAI_MODELS,
        ProviderKind::Claude => CLAUDE_MODELS,
        ProviderKind::Gemini => GEMINI_MODELS,
        ProviderKind::Grok => GROK_MODELS,
    }
}

/// The default model a provider activates with
fn default_model(kind: ProviderKind) -> &'static ModelInfo {
    &models_for(kind)[0]
}

// ─────────────────────────────────────────────────────────────────
// Status Snapshot
// ─────────────────────────────────────────────────────────────────

/// Read-only snapshot for observability
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub current_provider: String,
    pub current_model: String,
    pub available_providers: Vec<String>,
    pub models_count: usize,
}

// ─────────────────────────────────────────────────────────────────
// Provider Manager
// ─────────────────────────────────────────────────────────────────

/// The current provider/model pair. Invariant: the model belongs to the
/// provider, and the provider is in the available set.
struct Selection {
    provider: ProviderKind,
    model: &'static ModelInfo,
}

/// Routes chat calls to the adapter for the currently selected provider.
///
/// The selection is process-wide shared state: a `set_provider`/`set_model`
/// takes effect for all subsequent requests from all users.
pub struct ProviderManager {
    backends: HashMap<ProviderKind, Box<dyn ChatBackend>>,
    available: Vec<ProviderKind>,
    selection: RwLock<Selection>,
}

impl ProviderManager {
    /// Build the manager from provider settings.
    ///
    /// Every adapter is constructed; availability is decided purely by which
    /// keys are present. Free needs no key and is always in the set.
    pub fn from_config(settings: &ProviderSettings) -> Self {
        let timeout = settings.timeout_secs;

        let mut backends: HashMap<ProviderKind, Box<dyn ChatBackend>> = HashMap::new();
        backends.insert(
            ProviderKind::Free,
            Box::new(FreeBackend::new(settings.free_base_url.clone(), timeout)),
        );
        backends.insert(
            ProviderKind::OpenAi,
            Box::new(OpenAiBackend::new(
                settings.openai_base_url.clone(),
                present(&settings.openai_key),
                timeout,
            )),
        );
        backends.insert(
            ProviderKind::Claude,
            Box::new(ClaudeBackend::new(
                settings.claude_base_url.clone(),
                present(&settings.claude_key),
                timeout,
            )),
        );
        backends.insert(
            ProviderKind::Gemini,
            Box::new(GeminiBackend::new(
                settings.gemini_base_url.clone(),
                present(&settings.gemini_key),
                timeout,
            )),
        );
        backends.insert(
            ProviderKind::Grok,
            Box::new(GrokBackend::new(
                FreeBackend::new(settings.free_base_url.clone(), timeout),
                default_model(ProviderKind::Free).name.to_string(),
            )),
        );

        let mut available = vec![ProviderKind::Free];
        if present(&settings.openai_key).is_some() {
            available.push(ProviderKind::OpenAi);
        }
        if present(&settings.claude_key).is_some() {
            available.push(ProviderKind::Claude);
        }
        if present(&settings.gemini_key).is_some() {
            available.push(ProviderKind::Gemini);
        }
        if present(&settings.grok_key).is_some() {
            available.push(ProviderKind::Grok);
        }

        let manager = Self::with_backends(backends, available);

        // Honor the configured startup provider when its credential is there
        match settings.default_provider.parse::<ProviderKind>() {
            Ok(kind) => {
                if !manager.set_provider(kind) {
                    warn!(
                        provider = %kind,
                        "Configured default provider is not available, staying on Free"
                    );
                }
            }
            Err(reason) => warn!(%reason, "Ignoring configured default provider"),
        }

        let names: Vec<&str> = manager.available.iter().map(|p| p.name()).collect();
        info!(
            current = %manager.current_provider(),
            model = manager.current_model().name,
            available = ?names,
            "Provider manager initialized"
        );

        manager
    }

    /// Build a manager over explicit adapters. Used by tests to inject mock
    /// backends; Free is forced into the available set to keep the
    /// always-available invariant.
    pub fn with_backends(
        backends: HashMap<ProviderKind, Box<dyn ChatBackend>>,
        mut available: Vec<ProviderKind>,
    ) -> Self {
        if !available.contains(&ProviderKind::Free) {
            available.insert(0, ProviderKind::Free);
        }

        Self {
            backends,
            available,
            selection: RwLock::new(Selection {
                provider: ProviderKind::Free,
                model: default_model(ProviderKind::Free),
            }),
        }
    }

    /// The ordered set of available providers (always contains Free)
    pub fn available_providers(&self) -> &[ProviderKind] {
        &self.available
    }

    /// Whether a provider is in the available set
    pub fn is_available(&self, kind: ProviderKind) -> bool {
        self.available.contains(&kind)
    }

    /// The currently selected provider
    pub fn current_provider(&self) -> ProviderKind {
        self.selection.read().provider
    }

    /// The currently selected model
    pub fn current_model(&self) -> &'static ModelInfo {
        self.selection.read().model
    }

    /// Switch provider. Succeeds only for available kinds; on success the
    /// model resets to the kind's default. On failure nothing changes.
    pub fn set_provider(&self, kind: ProviderKind) -> bool {
        if !self.is_available(kind) {
            return false;
        }

        let mut selection = self.selection.write();
        selection.provider = kind;
        selection.model = default_model(kind);
        info!(provider = %kind, model = selection.model.name, "Provider changed");
        true
    }

    /// Switch model within the current provider. Unknown names (including
    /// models of other providers) are rejected without a state change.
    pub fn set_model(&self, name: &str) -> bool {
        let mut selection = self.selection.write();
        match models_for(selection.provider).iter().find(|m| m.name == name) {
            Some(model) => {
                selection.model = model;
                info!(model = name, "Model changed");
                true
            }
            None => false,
        }
    }

    /// Dispatch a chat call to the current provider's adapter.
    ///
    /// A single attempt; failures are typed errors logged here with provider
    /// context and softened into notice text by the orchestrator.
    pub async fn get_response(&self, messages: &[ChatTurn]) -> Result<String> {
        let (kind, model) = {
            let selection = self.selection.read();
            (selection.provider, selection.model.name)
        };

        let backend = self.backends.get(&kind).ok_or_else(|| {
            Error::Internal(format!("No adapter registered for provider '{}'", kind))
        })?;

        match backend.get_response(model, messages).await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!(provider = %kind, model, error = %e.format_for_log(), "Provider call failed");
                Err(e)
            }
        }
    }

    /// Read-only status snapshot
    pub fn status(&self) -> ProviderStatus {
        let selection = self.selection.read();
        ProviderStatus {
            current_provider: selection.provider.name().to_string(),
            current_model: selection.model.name.to_string(),
            available_providers: self
                .available_providers()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            models_count: models_for(selection.provider).len(),
        }
    }
}

/// Treat empty-string keys the same as absent ones
fn present(key: &Option<String>) -> Option<String> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
