//! Error types for polybot
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-facing notice text for soft provider failures
//! - Exit codes for the CLI
//!
//! Startup (configuration) errors are fatal; provider errors are soft and
//! rendered into notice text by the orchestrator, never propagated to the
//! transport layer as failures.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,

    // Gateway errors (3xx)
    GatewayConnect = 300,

    // Provider errors (5xx)
    CredentialMissing = 500,
    ProviderRequest = 501,
    ProviderResponse = 502,
    ProviderTimeout = 503,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Gateway errors
            500..=599 => 50, // Provider errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors (fatal at startup)
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Gateway Errors
    // ─────────────────────────────────────────────────────────────

    /// Discord gateway connect/run failure
    #[error("Gateway error: {0}")]
    Gateway(String),

    // ─────────────────────────────────────────────────────────────
    // Provider Errors (soft, per-call)
    // ─────────────────────────────────────────────────────────────

    /// The selected provider has no credential configured
    #[error("No API key configured for provider '{provider}'")]
    MissingCredential { provider: &'static str },

    /// Transport-level failure reaching the provider
    #[error("Request to provider '{provider}' failed: {message}")]
    ProviderRequest {
        provider: &'static str,
        message: String,
    },

    /// The provider answered with an error status or an unparseable body
    #[error("Provider '{provider}' returned a bad response: {message}")]
    ProviderResponse {
        provider: &'static str,
        message: String,
    },

    /// The provider call exceeded the configured timeout
    #[error("Provider '{provider}' timed out after {timeout_secs}s")]
    ProviderTimeout {
        provider: &'static str,
        timeout_secs: u64,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoWrite,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::Gateway(_) => ErrorCode::GatewayConnect,

            Error::MissingCredential { .. } => ErrorCode::CredentialMissing,
            Error::ProviderRequest { .. } => ErrorCode::ProviderRequest,
            Error::ProviderResponse { .. } => ErrorCode::ProviderResponse,
            Error::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is a soft per-call provider failure
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential { .. }
                | Error::ProviderRequest { .. }
                | Error::ProviderResponse { .. }
                | Error::ProviderTimeout { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// User-facing notice text for soft provider failures.
    ///
    /// The transport layer shows this text instead of an error; the full
    /// error stays in the logs.
    pub fn user_notice(&self) -> String {
        match self {
            Error::MissingCredential { provider } => {
                format!("The {} API key is not configured.", provider)
            }
            Error::ProviderRequest { provider, .. } => {
                format!("I couldn't reach {}. Please try again.", provider)
            }
            Error::ProviderResponse { provider, .. } => {
                format!("{} returned an unexpected response. Please try again.", provider)
            }
            Error::ProviderTimeout { provider, .. } => {
                format!("{} took too long to answer. Please try again.", provider)
            }
            _ => "Sorry, something went wrong while processing your message.".to_string(),
        }
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'polybot config init' to create a default configuration file.")
            }
            Error::ConfigParse { .. } => {
                Some("Check your configuration file syntax. Run 'polybot config validate' to see details.")
            }
            Error::ConfigValidation { .. } | Error::Config(_) => {
                Some("Review the configuration file and fix the invalid values. See documentation for valid options.")
            }
            Error::Gateway(_) => {
                Some("Verify your Discord bot token and that the bot has the message-content intent enabled.")
            }
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", code.as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a provider request error
    pub fn provider_request(provider: &'static str, message: impl Into<String>) -> Self {
        Error::ProviderRequest {
            provider,
            message: message.into(),
        }
    }

    /// Create a provider response error
    pub fn provider_response(provider: &'static str, message: impl Into<String>) -> Self {
        Error::ProviderResponse {
            provider,
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::CredentialMissing.as_str(), "E500");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::GatewayConnect.exit_code(), 30);
        assert_eq!(ErrorCode::ProviderRequest.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_soft_classification() {
        assert!(Error::MissingCredential { provider: "Claude" }.is_soft());
        assert!(Error::provider_request("Gemini", "connection refused").is_soft());
        assert!(Error::ProviderTimeout {
            provider: "OpenAI",
            timeout_secs: 120
        }
        .is_soft());
        assert!(!Error::config_validation("nope").is_soft());
    }

    #[test]
    fn test_user_notice_names_provider() {
        let err = Error::MissingCredential { provider: "OpenAI" };
        assert!(err.user_notice().contains("OpenAI"));

        let err = Error::provider_request("Claude", "dns failure");
        assert!(err.user_notice().contains("Claude"));
        // Transport details never leak into the notice
        assert!(!err.user_notice().contains("dns"));
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/test/config.toml"),
        };
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::provider_response("Gemini", "missing candidates");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E502]"));
        assert!(!formatted.contains("\x1b["));
    }
}
