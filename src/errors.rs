//! # Application Error Types
//!
//! This module defines common error types used throughout the Tour Finder bot.
//! It provides structured error handling for configuration, the flight
//! pricing provider and the Telegram front end.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Network/communication errors (connect failures, timeouts)
    Network(String),
    /// Provider answered with a non-success HTTP status
    Api { status: u16, body: String },
    /// Provider body could not be decoded
    Parse(String),
    /// Telegram API errors
    Telegram(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Api { status, body } => {
                if body.is_empty() {
                    write!(f, "[API] provider returned HTTP {}", status)
                } else {
                    write!(f, "[API] provider returned HTTP {}: {}", status, body)
                }
            }
            AppError::Parse(msg) => write!(f, "[PARSE] {}", msg),
            AppError::Telegram(msg) => write!(f, "[TELEGRAM] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Network(_) => "network",
            AppError::Api { .. } => "api",
            AppError::Parse(_) => "parse",
            AppError::Telegram(_) => "telegram",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the provider token in its query string
        let err = err.without_url();
        if let Some(status) = err.status() {
            return AppError::Api {
                status: status.as_u16(),
                body: String::new(),
            };
        }
        if err.is_decode() {
            return AppError::Parse(err.to_string());
        }
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Telegram(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::{error, warn};

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        chat_id: Option<i64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            chat_id = ?chat_id,
            "Network operation failed"
        );
    }

    /// Log a provider item that was dropped during mapping
    pub fn log_skipped_item(error: &impl std::fmt::Display, index: usize, reason: &str) {
        warn!(
            error = %error,
            item_index = index,
            reason = %reason,
            "Skipping provider item that could not be mapped"
        );
    }

    /// Log Telegram delivery errors
    pub fn log_telegram_error(error: &impl std::fmt::Display, operation: &str, chat_id: i64) {
        error!(
            error = %error,
            operation = %operation,
            chat_id = %chat_id,
            "Telegram operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
