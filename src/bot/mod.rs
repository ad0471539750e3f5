//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Entry point for incoming messages and command routing
//! - `command_handlers`: `/start`, `/help` and `/tours`
//! - `ui_builder`: Formats offer cards and other replies

pub mod command_handlers;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::Bot;

use crate::config::{AppConfig, SearchConfig};
use crate::localization::LocalizationManager;
use crate::tours::TourSearch;

/// Common context for bot handlers containing shared dependencies
#[derive(Debug)]
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub search_config: &'a SearchConfig,
    pub localization: &'a Arc<LocalizationManager>,
    pub language_code: Option<&'a str>,
}

/// Long-lived dependencies cloned into every dispatcher invocation
#[derive(Clone)]
pub struct BotState {
    pub config: Arc<AppConfig>,
    pub search: Arc<dyn TourSearch>,
    pub localization: Arc<LocalizationManager>,
    /// Username from `getMe`, used to ignore commands addressed to other bots
    pub bot_username: Option<String>,
}

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Tours,
}

impl BotCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotCommand::Start => "start",
            BotCommand::Help => "help",
            BotCommand::Tours => "tours",
        }
    }
}

/// Parse a command from message text.
///
/// Ignores any arguments after the command. A `@botname` suffix must match
/// `bot_username` (case-insensitive) when the username is known.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<BotCommand> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let (name, addressee) = match command.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (command, None),
    };

    if let (Some(addressee), Some(own)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(own.trim_start_matches('@')) {
            return None;
        }
    }

    match name.to_lowercase().as_str() {
        "start" => Some(BotCommand::Start),
        "help" => Some(BotCommand::Help),
        "tours" => Some(BotCommand::Tours),
        _ => None,
    }
}

// Re-export main handler functions for use in main.rs
pub use command_handlers::{build_tours_outcome, TourSearchOutcome, MAX_TOURS_TO_SHOW};
pub use message_handler::message_handler;
pub use ui_builder::format_tour_message;
