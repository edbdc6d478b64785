//! Configuration system for polybot
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. Environment variables (deployment-style names such as DISCORD_BOT_TOKEN,
//!    OPENAI_KEY, plus POLYBOT_* for the rest)
//! 2. Configuration file (TOML)
//! 3. Default values

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Main bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Discord connection settings
    pub discord: DiscordSettings,

    /// Conversation window settings
    pub conversation: ConversationSettings,

    /// Persona settings
    pub persona: PersonaSettings,

    /// Provider credentials and endpoints
    pub providers: ProviderSettings,

    /// Admin allow-list
    pub admin: AdminSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Discord connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// Bot token (usually supplied via DISCORD_BOT_TOKEN)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Command prefix for guild channels
    pub command_prefix: String,
}

/// Conversation window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Hard cap on stored turns per user before a trim is triggered
    pub history_limit: usize,

    /// Number of most-recent turns retained after a trim
    pub trim_window: usize,

    /// Character limit per outgoing Discord message
    pub max_message_length: usize,
}

/// Persona settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Persona active at startup
    pub default_persona: String,
}

/// Provider credentials and endpoints.
///
/// A provider is considered available when its key is present; no live probe
/// is performed. The Free provider needs no credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider selected at startup (falls back to "free" when its key is absent)
    pub default_provider: String,

    /// Per-call timeout in seconds for all provider requests
    pub timeout_secs: u64,

    /// OpenAI API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// Anthropic API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_key: Option<String>,

    /// Anthropic API base URL
    pub claude_base_url: String,

    /// Google Gemini API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_key: Option<String>,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Grok API key (the adapter is a stub; the key only gates availability)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grok_key: Option<String>,

    /// Base URL for the no-credential Free provider (any OpenAI-compatible server)
    pub free_base_url: String,
}

/// Admin allow-list settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Comma-separated Discord user ids with elevated privileges.
    /// Blank and `#`-prefixed tokens are ignored.
    pub user_ids: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            discord: DiscordSettings::default(),
            conversation: ConversationSettings::default(),
            persona: PersonaSettings::default(),
            providers: ProviderSettings::default(),
            admin: AdminSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            command_prefix: "!".to_string(),
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            trim_window: 8,
            max_message_length: 2000,
        }
    }
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            default_persona: "helpful".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default_provider: "free".to_string(),
            timeout_secs: 120,
            openai_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            claude_key: None,
            claude_base_url: "https://api.anthropic.com".to_string(),
            gemini_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            grok_key: None,
            free_base_url: "http://localhost:11434/v1".to_string(),
        }
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            user_ids: String::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl AdminSettings {
    /// Parse the allow-list into a set of user ids.
    ///
    /// Blank tokens and `#`-prefixed comment tokens are discarded; tokens
    /// that fail to parse are logged and skipped rather than failing startup.
    pub fn parse_ids(&self) -> HashSet<u64> {
        let mut ids = HashSet::new();
        for token in self.user_ids.split(',') {
            let token = token.trim();
            if token.is_empty() || token.starts_with('#') {
                continue;
            }
            match token.parse::<u64>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => {
                    warn!(token, "Ignoring unparseable admin user id");
                }
            }
        }
        ids
    }
}

impl BotConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
            config = toml::from_str(&content)
                .map_err(|e| Error::config_parse(e.to_string()))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::ConfigNotFound { path });
            }
        }

        // Search in standard locations
        let search_paths = [
            PathBuf::from("polybot.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("polybot").join("bot.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".polybot").join("bot.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Deployment-style names, matching the conventional .env layout
        if let Ok(val) = std::env::var("DISCORD_BOT_TOKEN") {
            self.discord.token = val;
        }
        if let Ok(val) = std::env::var("OPENAI_KEY") {
            self.providers.openai_key = Some(val);
        }
        if let Ok(val) = std::env::var("CLAUDE_KEY") {
            self.providers.claude_key = Some(val);
        }
        if let Ok(val) = std::env::var("GEMINI_KEY") {
            self.providers.gemini_key = Some(val);
        }
        if let Ok(val) = std::env::var("GROK_KEY") {
            self.providers.grok_key = Some(val);
        }
        if let Ok(val) = std::env::var("ADMIN_USER_IDS") {
            self.admin.user_ids = val;
        }
        if let Ok(val) = std::env::var("CONVERSATION_HISTORY_LIMIT") {
            if let Ok(n) = val.parse() {
                self.conversation.history_limit = n;
            }
        }
        if let Ok(val) = std::env::var("TRIM_CONVERSATION_SIZE") {
            if let Ok(n) = val.parse() {
                self.conversation.trim_window = n;
            }
        }
        if let Ok(val) = std::env::var("MAX_MESSAGE_LENGTH") {
            if let Ok(n) = val.parse() {
                self.conversation.max_message_length = n;
            }
        }

        // POLYBOT_* names for the rest
        if let Ok(val) = std::env::var("POLYBOT_COMMAND_PREFIX") {
            self.discord.command_prefix = val;
        }
        if let Ok(val) = std::env::var("POLYBOT_DEFAULT_PERSONA") {
            self.persona.default_persona = val;
        }
        if let Ok(val) = std::env::var("POLYBOT_DEFAULT_PROVIDER") {
            self.providers.default_provider = val;
        }
        if let Ok(val) = std::env::var("POLYBOT_PROVIDER_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.providers.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("POLYBOT_FREE_BASE_URL") {
            self.providers.free_base_url = val;
        }
        if let Ok(val) = std::env::var("POLYBOT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("POLYBOT_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("POLYBOT_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration (token is checked separately, see
    /// [`BotConfig::validate_for_run`], so `config validate` works on a
    /// tokenless file).
    pub fn validate(&self) -> Result<()> {
        if self.conversation.history_limit < 2 {
            return Err(Error::config_validation(
                "conversation.history_limit must be at least 2",
            ));
        }
        if self.conversation.trim_window == 0 {
            return Err(Error::config_validation(
                "conversation.trim_window must be at least 1",
            ));
        }
        if self.conversation.trim_window > self.conversation.history_limit {
            return Err(Error::config_validation(
                "conversation.trim_window cannot exceed conversation.history_limit",
            ));
        }
        if self.conversation.max_message_length == 0 {
            return Err(Error::config_validation(
                "conversation.max_message_length must be at least 1",
            ));
        }
        if self.discord.command_prefix.is_empty() {
            return Err(Error::config_validation(
                "discord.command_prefix cannot be empty",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Validate settings that are mandatory to actually serve traffic.
    ///
    /// A missing or malformed Discord token is fatal at startup.
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;

        let token = self.discord.token.trim();
        if token.is_empty() {
            return Err(Error::config_validation(
                "Discord bot token is missing. Set DISCORD_BOT_TOKEN or discord.token",
            ));
        }
        // Discord bot tokens are base64-prefixed snowflakes of a known shape
        let known_prefixes = ["MTA", "MTM", "MTI", "OTA", "OTM", "OTI"];
        let prefix_ok = known_prefixes.iter().any(|p| token.starts_with(p));
        if !prefix_ok || token.len() < 50 {
            return Err(Error::config_validation(
                "Discord bot token has an invalid format",
            ));
        }

        Ok(())
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".polybot")
                .join("bot.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, generate_default_config())?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# polybot configuration
# https://github.com/polybot/polybot

[discord]
# Bot token. Prefer setting DISCORD_BOT_TOKEN in the environment instead
# of writing it to disk.
# token = ""

# Command prefix for guild channels
command_prefix = "!"

[conversation]
# Hard cap on stored turns per user before a trim is triggered
history_limit = 20

# Number of most-recent turns retained after a trim
trim_window = 8

# Character limit per outgoing Discord message
max_message_length = 2000

[persona]
# Persona active at startup
default_persona = "helpful"

[providers]
# Provider selected at startup: free, openai, claude, gemini, grok
default_provider = "free"

# Per-call timeout in seconds for all provider requests
timeout_secs = 120

# API keys. Prefer OPENAI_KEY / CLAUDE_KEY / GEMINI_KEY / GROK_KEY in the
# environment. A provider is listed as available only when its key is set.
# openai_key = ""
# claude_key = ""
# gemini_key = ""
# grok_key = ""

# Endpoints
openai_base_url = "https://api.openai.com/v1"
claude_base_url = "https://api.anthropic.com"
gemini_base_url = "https://generativelanguage.googleapis.com"

# Base URL for the no-credential Free provider (any OpenAI-compatible server)
free_base_url = "http://localhost:11434/v1"

[admin]
# Comma-separated Discord user ids with access to restricted personas
user_ids = ""

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.polybot/logs/bot.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
