//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the polybot binary
fn bot_cmd() -> Command {
    let mut cmd = Command::cargo_bin("polybot").unwrap();
    // Isolate from any ambient deployment environment
    cmd.env_remove("DISCORD_BOT_TOKEN")
        .env_remove("OPENAI_KEY")
        .env_remove("CLAUDE_KEY")
        .env_remove("GEMINI_KEY")
        .env_remove("GROK_KEY")
        .env_remove("ADMIN_USER_IDS")
        .env_remove("CONVERSATION_HISTORY_LIMIT")
        .env_remove("TRIM_CONVERSATION_SIZE")
        .env_remove("MAX_MESSAGE_LENGTH");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    bot_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("polybot"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("personas"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    bot_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polybot"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Git Hash"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    bot_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polybot"));
}

// ─────────────────────────────────────────────────────────────────
// Personas Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_personas_lists_public_catalog() {
    bot_cmd()
        .arg("personas")
        .assert()
        .success()
        .stdout(predicate::str::contains("helpful"))
        .stdout(predicate::str::contains("teacher"))
        .stdout(predicate::str::contains("jailbreak").not());
}

#[test]
fn test_personas_all_includes_restricted() {
    bot_cmd()
        .arg("personas")
        .arg("--all")
        .assert()
        .success()
        .stdout(predicate::str::contains("jailbreak"))
        .stdout(predicate::str::contains("[restricted]"));
}

// ─────────────────────────────────────────────────────────────────
// Providers Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_providers_lists_catalog() {
    bot_cmd()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Free:"))
        .stdout(predicate::str::contains("OpenAI:"))
        .stdout(predicate::str::contains("claude-3-opus"))
        .stdout(predicate::str::contains("gemini-pro"))
        .stdout(predicate::str::contains("grok-beta"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    bot_cmd()
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("[discord]"))
        .stdout(predicate::str::contains("[conversation]"))
        .stdout(predicate::str::contains("[providers]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_default() {
    // Default config should always be valid
    bot_cmd()
        .arg("config")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    bot_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/path/config.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found").or(predicate::str::contains("Error")));
}

#[test]
fn test_config_init_help() {
    bot_cmd()
        .arg("config")
        .arg("init")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"))
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Run Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_help() {
    bot_cmd()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run the bot"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_run_with_invalid_config() {
    bot_cmd()
        .arg("run")
        .arg("--config")
        .arg("/nonexistent/config.toml")
        .assert()
        .failure();
}

#[test]
fn test_run_without_token_fails_fast() {
    // A missing Discord token is a startup configuration error, not a hang
    bot_cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Flag Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag() {
    bot_cmd().arg("-v").arg("version").assert().success();
}

#[test]
fn test_quiet_flag() {
    bot_cmd().arg("--quiet").arg("version").assert().success();
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    bot_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    bot_cmd().assert().failure();
}
