//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, Instrument};

use super::command_handlers::{handle_start_command, handle_tours_command, handle_unknown_message};
use super::{parse_command, BotCommand, BotState, HandlerContext};
use crate::errors::error_logging;
use crate::observability;

/// Dispatcher endpoint for every incoming message
pub async fn message_handler(bot: Bot, msg: Message, state: BotState) -> Result<()> {
    let chat_id = msg.chat.id;
    let span = observability::telegram_span("message", chat_id.0);

    async {
        let Some(text) = msg.text() else {
            debug!(chat_id = %chat_id, "Ignoring non-text message");
            observability::record_telegram_message("non_text");
            return Ok(());
        };
        observability::record_telegram_message("text");

        // Extract user's language code from Telegram
        let language_code = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.as_deref());

        let ctx = HandlerContext {
            bot: &bot,
            search_config: &state.config.search,
            localization: &state.localization,
            language_code,
        };

        let result = match parse_command(text, state.bot_username.as_deref()) {
            Some(command) => {
                observability::record_command(command.as_str());
                match command {
                    BotCommand::Start | BotCommand::Help => {
                        handle_start_command(&ctx, chat_id).await
                    }
                    BotCommand::Tours => {
                        handle_tours_command(&ctx, chat_id, state.search.as_ref()).await
                    }
                }
            }
            None => {
                handle_unknown_message(&bot, &msg.chat, &state.localization, language_code).await
            }
        };

        if let Err(e) = &result {
            error_logging::log_telegram_error(e, "message_handler", chat_id.0);
        }
        result.map_err(anyhow::Error::from)
    }
    .instrument(span)
    .await
}
