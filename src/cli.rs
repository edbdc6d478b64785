//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for polybot.

use clap::{Parser, Subcommand};

/// polybot - Multi-provider AI chat bot for Discord
///
/// Connects to the Discord gateway, routes chat messages to the selected
/// AI provider, and keeps a bounded per-user conversation window.
#[derive(Parser, Debug)]
#[command(name = "polybot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the bot
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot (connects to Discord and serves chat)
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "POLYBOT_CONFIG")]
        config: Option<String>,
    },

    /// List the personas in the catalog
    Personas {
        /// Include restricted (admin-only) personas
        #[arg(long)]
        all: bool,
    },

    /// List provider kinds and their model catalogs
    Providers,

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::parse_from(["polybot", "run", "--config", "bot.toml"]);
        match cli.command {
            Commands::Run { config } => assert_eq!(config.as_deref(), Some("bot.toml")),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_personas_all() {
        let cli = Cli::parse_from(["polybot", "personas", "--all"]);
        match cli.command {
            Commands::Personas { all } => assert!(all),
            _ => panic!("expected personas command"),
        }
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::parse_from(["polybot", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
    }
}
