//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all application settings into a single, structured configuration object.
//! It supports loading from environment variables, validation, and provides
//! a clean interface for accessing configuration throughout the application.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::tours::TourFilter;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.travelpayouts.com/aviasales/v3/prices_for_dates";
pub const DEFAULT_LINK_BASE: &str = "https://www.aviasales.ru";

/// Bot-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds, shared by Telegram and provider clients
    pub http_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        // Telegram bot tokens look like `<numeric id>:<secret>`
        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config("Bot token bot ID must be numeric".to_string()));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Flight search settings for the pricing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Travelpayouts access token
    pub api_token: String,
    /// IATA code of the departure city
    pub origin: String,
    /// IATA code of the arrival city
    pub destination: String,
    /// Minimum nights at destination (inclusive)
    pub min_nights: u32,
    /// Maximum nights at destination (inclusive)
    pub max_nights: u32,
    /// Keep only flights without transfers
    pub direct_only: bool,
    /// First departure date of the search window
    pub date_from: NaiveDate,
    /// Last departure date of the search window
    pub date_to: NaiveDate,
    /// Maximum number of items requested from the provider
    pub result_limit: u32,
    /// Provider endpoint
    pub base_url: String,
    /// Prefix for relative booking links
    pub link_base: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            origin: "MOW".to_string(),
            destination: "UTP".to_string(),
            min_nights: 10,
            max_nights: 15,
            direct_only: true,
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default(),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap_or_default(),
            result_limit: 30,
            base_url: DEFAULT_API_URL.to_string(),
            link_base: DEFAULT_LINK_BASE.to_string(),
        }
    }
}

impl SearchConfig {
    /// Night-bounds and direct-only predicate derived from this configuration
    pub fn filter(&self) -> TourFilter {
        TourFilter {
            min_nights: self.min_nights,
            max_nights: self.max_nights,
            direct_only: self.direct_only,
        }
    }

    /// Departure window in the provider's `from:to` format
    pub fn departure_window(&self) -> String {
        format!(
            "{}:{}",
            self.date_from.format("%Y-%m-%d"),
            self.date_to.format("%Y-%m-%d")
        )
    }

    /// Validate search configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.api_token.trim().is_empty() {
            return Err(AppError::Config("API token cannot be empty".to_string()));
        }

        for (name, code) in [("Origin", &self.origin), ("Destination", &self.destination)] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(AppError::Config(format!(
                    "{} city code must be a 3-letter IATA code, got '{}'",
                    name, code
                )));
            }
        }

        if self.min_nights > self.max_nights {
            return Err(AppError::Config(format!(
                "MIN_NIGHTS ({}) cannot be greater than MAX_NIGHTS ({})",
                self.min_nights, self.max_nights
            )));
        }

        if self.date_from > self.date_to {
            return Err(AppError::Config(format!(
                "SEARCH_DATE_FROM ({}) cannot be after SEARCH_DATE_TO ({})",
                self.date_from, self.date_to
            )));
        }

        if self.result_limit == 0 || self.result_limit > 1000 {
            return Err(AppError::Config(
                "Search result limit must be between 1 and 1000".to_string(),
            ));
        }

        for (name, url) in [("API URL", &self.base_url), ("Link base", &self.link_base)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "{} must start with 'http://' or 'https://'",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Metrics and health server port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.metrics_port == 0 {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if !self.allow_privileged_ports && self.metrics_port < 1024 {
            return Err(AppError::Config(format!(
                "Metrics port {} is privileged. Set ALLOW_PRIVILEGED_PORTS=true or use port >= 1024",
                self.metrics_port
            )));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Bot configuration
    pub bot: BotConfig,
    /// Flight search configuration
    pub search: SearchConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.bot.token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        config.bot.http_timeout_secs = parse_or(&lookup, "HTTP_CLIENT_TIMEOUT_SECS", 30)?;

        config.search.api_token = required(&lookup, "AVIASALES_TOKEN")?;
        config.search.origin = lookup("ORIGIN_CITY_CODE")
            .unwrap_or_else(|| "MOW".to_string())
            .trim()
            .to_uppercase();
        config.search.destination = lookup("DESTINATION_CITY_CODE")
            .unwrap_or_else(|| "UTP".to_string())
            .trim()
            .to_uppercase();
        config.search.min_nights = parse_or(&lookup, "MIN_NIGHTS", 10)?;
        config.search.max_nights = parse_or(&lookup, "MAX_NIGHTS", 15)?;
        config.search.direct_only = lookup("DIRECT_ONLY")
            .unwrap_or_else(|| "true".to_string())
            .trim()
            .to_lowercase()
            == "true";
        config.search.date_from = parse_date_or(&lookup, "SEARCH_DATE_FROM", config.search.date_from)?;
        config.search.date_to = parse_date_or(&lookup, "SEARCH_DATE_TO", config.search.date_to)?;
        config.search.result_limit = parse_or(&lookup, "SEARCH_RESULT_LIMIT", 30)?;
        if let Some(url) = lookup("AVIASALES_API_URL") {
            config.search.base_url = url.trim().to_string();
        }
        if let Some(base) = lookup("AVIASALES_LINK_BASE") {
            config.search.link_base = base.trim().trim_end_matches('/').to_string();
        }

        config.server.metrics_port = parse_or(&lookup, "METRICS_PORT", 9090)?;
        config.server.allow_privileged_ports = lookup("ALLOW_PRIVILEGED_PORTS")
            .unwrap_or_else(|| "false".to_string())
            .to_lowercase()
            == "true";

        config.observability = ObservabilityConfig::from_source(&lookup);

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.search.validate()?;
        self.server.validate()?;
        self.observability
            .validate()
            .map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], api_token=[REDACTED], route={}->{}, nights={}-{}, direct_only={}, window={}, limit={}, metrics_port={}",
            self.search.origin,
            self.search.destination,
            self.search.min_nights,
            self.search.max_nights,
            self.search.direct_only,
            self.search.departure_window(),
            self.search.result_limit,
            self.server.metrics_port
        )
    }
}

fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => Err(AppError::Config(format!("{} cannot be empty", key))),
        None => Err(AppError::Config(format!(
            "{} environment variable is required (set it in .env or the environment)",
            key
        ))),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        None => Ok(default),
    }
}

fn parse_date_or<F>(lookup: &F, key: &str, default: NaiveDate) -> AppResult<NaiveDate>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Config(format!("{} must be a date in YYYY-MM-DD format", key))
        }),
        None => Ok(default),
    }
}
