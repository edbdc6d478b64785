//! Discord gateway glue
//!
//! Thin transport adapter over serenity. Prefix commands in guild channels
//! and free-form direct messages both funnel into the orchestrator; replies
//! are chunked to the configured character limit before sending.
//!
//! Access control for restricted personas lives here, in the command layer,
//! not in the orchestrator primitive.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serenity::all::{Client, Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::provider::{models_for, ProviderKind};

use super::split::split_message;

/// Serenity event handler holding the shared bot core
pub struct Handler {
    core: Arc<Orchestrator>,
    prefix: String,
    max_message_length: usize,
}

enum Command<'a> {
    Chat(&'a str),
    Reset,
    Persona(Option<&'a str>),
    Provider(Option<&'a str>),
    Model(Option<&'a str>),
    Status,
    Help,
    Unknown,
}

impl Handler {
    pub fn new(core: Arc<Orchestrator>, prefix: String, max_message_length: usize) -> Self {
        Self {
            core,
            prefix,
            max_message_length,
        }
    }

    /// Produce the reply for one inbound message, if any.
    ///
    /// Guild messages must carry the command prefix; direct messages without
    /// a prefix go straight to the chat path.
    async fn respond_to(
        &self,
        user_id: u64,
        content: &str,
        is_dm: bool,
        started: Instant,
    ) -> Option<String> {
        if let Some(input) = content.strip_prefix(self.prefix.as_str()) {
            Some(self.run_command(user_id, input.trim(), started).await)
        } else if is_dm {
            Some(self.core.handle(user_id, content).await)
        } else {
            None
        }
    }

    fn parse_command<'a>(&self, input: &'a str) -> Command<'a> {
        let mut parts = input.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("").to_lowercase();
        let rest = parts.next().map(str::trim).unwrap_or("");

        let arg = if rest.is_empty() { None } else { Some(rest) };
        match name.as_str() {
            "chat" => Command::Chat(rest),
            "reset" => Command::Reset,
            "persona" => Command::Persona(arg),
            "provider" => Command::Provider(arg),
            "model" => Command::Model(arg),
            "status" => Command::Status,
            "help" | "" => Command::Help,
            _ => Command::Unknown,
        }
    }

    async fn run_command(&self, user_id: u64, input: &str, started: Instant) -> String {
        match self.parse_command(input) {
            Command::Chat("") => format!("Usage: {}chat <message>", self.prefix),
            Command::Chat(text) => self.core.handle(user_id, text).await,
            Command::Reset => {
                if self.core.store().contains(user_id) {
                    self.core.clear_conversation(user_id);
                    "Conversation history cleared.".to_string()
                } else {
                    "You have no stored conversation.".to_string()
                }
            }
            Command::Persona(None) => self.render_persona_list(user_id),
            Command::Persona(Some(name)) => self.switch_persona(user_id, name),
            Command::Provider(None) => self.render_provider_info(),
            Command::Provider(Some(name)) => self.switch_provider(user_id, name),
            Command::Model(None) => self.render_model_list(),
            Command::Model(Some(name)) => self.switch_model(user_id, name),
            Command::Status => self.render_status(started),
            Command::Help => self.render_help(),
            Command::Unknown => format!("Unknown command. Try {}help.", self.prefix),
        }
    }

    fn switch_persona(&self, user_id: u64, name: &str) -> String {
        let personas = self.core.personas();
        let is_admin = self.core.is_admin(user_id);

        if personas.can_use(name, is_admin) {
            // can_use implies validity, so the switch cannot fail here
            self.core.set_persona(name);
            format!("Persona changed to: {}", name.to_lowercase())
        } else if personas.is_valid(name) {
            "That persona is restricted to admins.".to_string()
        } else {
            format!(
                "Unknown persona. Available: {}",
                personas.public_names().join(", ")
            )
        }
    }

    fn render_persona_list(&self, user_id: u64) -> String {
        let listing = self.core.personas().list_for(self.core.is_admin(user_id));
        let current = self.core.current_persona();

        let mut out = String::from("**Available personas**\n");
        for (name, info) in listing {
            let restricted = if info.restricted { " [restricted]" } else { "" };
            let marker = if name == current { " (current)" } else { "" };
            out.push_str(&format!(
                "`{}`: {}{}{}\n",
                name, info.description, restricted, marker
            ));
        }
        out
    }

    fn available_provider_names(&self) -> String {
        self.core
            .providers()
            .available_providers()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_provider_info(&self) -> String {
        let status = self.core.providers().status();
        format!(
            "Provider: {} ({})\nAvailable: {}",
            status.current_provider,
            status.current_model,
            status.available_providers.join(", ")
        )
    }

    fn switch_provider(&self, user_id: u64, name: &str) -> String {
        if !self.core.is_admin(user_id) {
            return "Switching providers is restricted to admins.".to_string();
        }

        let providers = self.core.providers();
        match name.parse::<ProviderKind>() {
            Ok(kind) if providers.set_provider(kind) => format!(
                "Provider changed to: {} ({})",
                kind.name(),
                providers.current_model().name
            ),
            Ok(kind) => format!(
                "{} is not available. Available: {}",
                kind.name(),
                self.available_provider_names()
            ),
            Err(_) => format!(
                "Unknown provider. Available: {}",
                self.available_provider_names()
            ),
        }
    }

    fn render_model_list(&self) -> String {
        let providers = self.core.providers();
        let kind = providers.current_provider();
        let current = providers.current_model().name;

        let mut out = format!("**Models for {}**\n", kind.name());
        for model in models_for(kind) {
            let marker = if model.name == current { " (current)" } else { "" };
            out.push_str(&format!(
                "`{}`: {} token context{}\n",
                model.name, model.max_tokens, marker
            ));
        }
        out
    }

    fn switch_model(&self, user_id: u64, name: &str) -> String {
        if !self.core.is_admin(user_id) {
            return "Switching models is restricted to admins.".to_string();
        }

        let providers = self.core.providers();
        if providers.set_model(name) {
            format!("Model changed to: {}", name)
        } else {
            format!(
                "Unknown model for {}.\n{}",
                providers.current_provider().name(),
                self.render_model_list()
            )
        }
    }

    fn render_status(&self, started: Instant) -> String {
        let status = self.core.status();
        let uptime = Utc::now().signed_duration_since(status.started_at);

        format!(
            "**Bot Status**\n\
             Persona: {}\n\
             Provider: {} ({})\n\
             Available providers: {}\n\
             Active conversations: {}\n\
             Uptime: {}h {}m\n\
             Latency: {}ms",
            status.persona,
            status.provider.current_provider,
            status.provider.current_model,
            status.provider.available_providers.join(", "),
            status.active_conversations,
            uptime.num_hours(),
            uptime.num_minutes() % 60,
            started.elapsed().as_millis(),
        )
    }

    fn render_help(&self) -> String {
        let p = &self.prefix;
        format!(
            "**Commands**\n\
             {p}chat <message>: talk to the bot\n\
             {p}reset: clear your conversation history\n\
             {p}persona [name]: list or switch personas\n\
             {p}provider [name]: show or switch providers (switching is admin-only)\n\
             {p}model [name]: show or switch models (switching is admin-only)\n\
             {p}status: show bot status\n\
             Direct messages without a prefix go straight to the bot."
        )
    }

    async fn send_chunked(&self, ctx: &Context, msg: &Message, reply: &str) {
        for chunk in split_message(reply, self.max_message_length) {
            if let Err(e) = msg.channel_id.say(&ctx.http, chunk).await {
                error!(error = %e, channel = %msg.channel_id, "Failed to send reply");
                break;
            }
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let content = msg.content.trim();
        if content.is_empty() {
            return;
        }

        let started = Instant::now();
        let user_id = msg.author.id.get();
        let is_dm = msg.guild_id.is_none();

        if let Some(reply) = self.respond_to(user_id, content, is_dm, started).await {
            self.send_chunked(&ctx, &msg, &reply).await;
        }
    }
}

/// Connect to Discord and serve until the gateway stops.
pub async fn run_bot(config: &BotConfig, core: Arc<Orchestrator>) -> Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = Handler::new(
        core,
        config.discord.command_prefix.clone(),
        config.conversation.max_message_length,
    );

    let mut client = Client::builder(&config.discord.token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| Error::Gateway(e.to_string()))?;

    info!("Starting Discord gateway");
    client
        .start()
        .await
        .map_err(|e| Error::Gateway(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::provider::{ChatBackend, MockBackend, ProviderKind, ProviderManager};

    fn handler_with(backend: MockBackend, admin_ids: &str) -> Handler {
        let mut config = BotConfig::default();
        config.admin.user_ids = admin_ids.to_string();

        let mut backends: HashMap<ProviderKind, Box<dyn ChatBackend>> = HashMap::new();
        backends.insert(ProviderKind::Free, Box::new(backend));
        let providers = ProviderManager::with_backends(backends, vec![ProviderKind::Free]);

        Handler::new(
            Arc::new(Orchestrator::new(&config, providers)),
            "!".to_string(),
            2000,
        )
    }

    #[tokio::test]
    async fn test_dm_without_prefix_reaches_chat() {
        let handler = handler_with(MockBackend::echo("echo:"), "");
        let reply = handler.respond_to(1, "hello", true, Instant::now()).await;
        assert_eq!(reply.as_deref(), Some("echo:hello"));
    }

    #[tokio::test]
    async fn test_guild_message_without_prefix_is_ignored() {
        let handler = handler_with(MockBackend::echo("echo:"), "");
        let reply = handler.respond_to(1, "hello", false, Instant::now()).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_chat_command() {
        let handler = handler_with(MockBackend::echo("echo:"), "");
        let reply = handler
            .respond_to(1, "!chat how are you", false, Instant::now())
            .await;
        assert_eq!(reply.as_deref(), Some("echo:how are you"));
    }

    #[tokio::test]
    async fn test_chat_command_without_text_shows_usage() {
        let handler = handler_with(MockBackend::echo("echo:"), "");
        let reply = handler.respond_to(1, "!chat", false, Instant::now()).await;
        assert!(reply.unwrap().contains("Usage"));
    }

    #[tokio::test]
    async fn test_reset_command_clears_history() {
        let handler = handler_with(MockBackend::echo("echo:"), "");
        handler.respond_to(1, "hello", true, Instant::now()).await;
        assert!(handler.core.store().contains(1));

        let reply = handler.respond_to(1, "!reset", true, Instant::now()).await;
        assert!(reply.unwrap().contains("cleared"));
        assert!(!handler.core.store().contains(1));
    }

    #[tokio::test]
    async fn test_restricted_persona_denied_for_non_admin() {
        let handler = handler_with(MockBackend::new(), "99");

        let reply = handler
            .respond_to(1, "!persona jailbreak", false, Instant::now())
            .await
            .unwrap();

        assert!(reply.contains("restricted"));
        assert_eq!(handler.core.current_persona(), "helpful");
    }

    #[tokio::test]
    async fn test_restricted_persona_allowed_for_admin() {
        let handler = handler_with(MockBackend::new(), "99");

        let reply = handler
            .respond_to(99, "!persona jailbreak", false, Instant::now())
            .await
            .unwrap();

        assert!(reply.contains("jailbreak"));
        assert_eq!(handler.core.current_persona(), "jailbreak");
    }

    #[tokio::test]
    async fn test_unknown_persona_lists_choices() {
        let handler = handler_with(MockBackend::new(), "");

        let reply = handler
            .respond_to(1, "!persona nonexistent", false, Instant::now())
            .await
            .unwrap();

        assert!(reply.contains("Unknown persona"));
        assert!(reply.contains("helpful"));
    }

    #[tokio::test]
    async fn test_persona_listing_hides_restricted() {
        let handler = handler_with(MockBackend::new(), "99");

        let public = handler
            .respond_to(1, "!persona", false, Instant::now())
            .await
            .unwrap();
        assert!(!public.contains("jailbreak"));

        let admin = handler
            .respond_to(99, "!persona", false, Instant::now())
            .await
            .unwrap();
        assert!(admin.contains("jailbreak"));
        assert!(admin.contains("[restricted]"));
    }

    #[tokio::test]
    async fn test_reset_without_history() {
        let handler = handler_with(MockBackend::new(), "");
        let reply = handler.respond_to(1, "!reset", true, Instant::now()).await;
        assert!(reply.unwrap().contains("no stored conversation"));
    }

    #[tokio::test]
    async fn test_provider_info_command() {
        let handler = handler_with(MockBackend::new(), "");
        let reply = handler
            .respond_to(1, "!provider", false, Instant::now())
            .await
            .unwrap();
        assert!(reply.contains("Provider: Free"));
        assert!(reply.contains("Available:"));
    }

    #[tokio::test]
    async fn test_provider_switch_is_admin_only() {
        let handler = handler_with(MockBackend::new(), "99");
        let reply = handler
            .respond_to(1, "!provider openai", false, Instant::now())
            .await
            .unwrap();
        assert!(reply.contains("restricted"));
    }

    #[tokio::test]
    async fn test_provider_switch_unavailable_lists_choices() {
        let handler = handler_with(MockBackend::new(), "99");
        let reply = handler
            .respond_to(99, "!provider claude", false, Instant::now())
            .await
            .unwrap();

        assert!(reply.contains("not available"));
        assert!(reply.contains("Free"));
        assert_eq!(
            handler.core.providers().current_provider(),
            ProviderKind::Free
        );
    }

    #[tokio::test]
    async fn test_model_listing_and_switch() {
        let handler = handler_with(MockBackend::new(), "99");

        let listing = handler
            .respond_to(1, "!model", false, Instant::now())
            .await
            .unwrap();
        assert!(listing.contains("gpt-3.5-turbo"));
        assert!(listing.contains("(current)"));

        // Free exposes a single model, so an unknown name lists it back
        let reply = handler
            .respond_to(99, "!model claude-3-opus", false, Instant::now())
            .await
            .unwrap();
        assert!(reply.contains("Unknown model"));
    }

    #[tokio::test]
    async fn test_status_command() {
        let handler = handler_with(MockBackend::new(), "");

        let reply = handler
            .respond_to(1, "!status", false, Instant::now())
            .await
            .unwrap();

        assert!(reply.contains("Persona: helpful"));
        assert!(reply.contains("Provider: Free"));
        assert!(reply.contains("Latency:"));
    }

    #[tokio::test]
    async fn test_unknown_command_points_to_help() {
        let handler = handler_with(MockBackend::new(), "");
        let reply = handler
            .respond_to(1, "!frobnicate", false, Instant::now())
            .await
            .unwrap();
        assert!(reply.contains("help"));
    }
}
