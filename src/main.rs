//! polybot - Multi-provider AI chat bot for Discord
//!
//! This is the main entry point for the polybot binary. The bot connects to
//! the Discord gateway, proxies chat messages to the selected AI provider,
//! keeps a bounded per-user conversation window, and applies a selectable
//! persona system prompt.

mod cli;
mod config;
mod conversation;
mod error;
mod gateway;
mod logging;
mod orchestrator;
mod persona;
mod provider;
mod version;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands, ConfigSubcommand};
use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::persona::PersonaRegistry;
use crate::provider::{models_for, ProviderKind, ProviderManager};

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // Commands that don't need full logging use minimal setup
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Personas { all } => {
            logging::init_simple(tracing::Level::WARN)?;
            print_personas(*all);
            return Ok(());
        }
        Commands::Providers => {
            logging::init_simple(tracing::Level::WARN)?;
            print_providers();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone());
        }
        Commands::Run { .. } => {}
    }

    let config_path = match &cli.command {
        Commands::Run { config } => config.clone(),
        _ => None,
    };

    // Load config (or use defaults)
    let config = match BotConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting polybot"
    );

    run_bot(config)
}

/// Validate run-critical settings, build the core, and serve until the
/// gateway stops.
fn run_bot(config: BotConfig) -> Result<()> {
    if let Err(e) = config.validate_for_run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let providers = ProviderManager::from_config(&config.providers);
        let core = Arc::new(Orchestrator::new(&config, providers));
        gateway::run_bot(&config, core).await
    })
}

/// Print the persona catalog to stdout
fn print_personas(include_restricted: bool) {
    let registry = PersonaRegistry::new();

    println!("Available personas:");
    for (name, info) in registry.list_for(include_restricted) {
        let restricted = if info.restricted { " [restricted]" } else { "" };
        println!("  {:<14} {:<24} {}{}", name, info.display_name, info.description, restricted);
    }
}

/// Print the provider/model catalog to stdout
fn print_providers() {
    for kind in ProviderKind::all() {
        println!("{}:", kind.name());
        for model in models_for(*kind) {
            println!(
                "  {:<18} {:>7} token context  ${:.4}/token",
                model.name, model.max_tokens, model.cost_per_token
            );
        }
    }
}

/// Handle config subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = BotConfig::load(config.as_deref())?;
            let toml_str = toml::to_string_pretty(&cfg)?;
            print!("{}", toml_str);
            Ok(())
        }
        ConfigSubcommand::Init { path, force } => config::init_config(path.as_deref(), force),
        ConfigSubcommand::Validate { config } => {
            match BotConfig::load(config.as_deref()) {
                Ok(_) => {
                    println!("Configuration is valid");
                    Ok(())
                }
                Err(e) => {
                    eprint!("{}", e.format_for_terminal());
                    std::process::exit(e.exit_code());
                }
            }
        }
    }
}
