//! Command Handlers module for processing bot commands

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{Chat, ParseMode};
use tracing::{debug, info, warn};

use super::ui_builder::{
    empty_results_message, format_tour_message, search_error_message, truncated_results_message,
    wait_message, welcome_message,
};
use super::HandlerContext;
use crate::errors::AppResult;
use crate::localization::{t_lang, LocalizationManager};
use crate::observability;
use crate::tours::TourSearch;

/// Upper bound on offer messages per `/tours` command
pub const MAX_TOURS_TO_SHOW: usize = 5;

/// Replies produced by one `/tours` run, after the "please wait" message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourSearchOutcome {
    /// The provider call failed; one error message
    Failed(String),
    /// Nothing matched the filter; one explanatory message
    Empty(String),
    /// Offer cards, plus a summary when some were left out
    Found {
        offers: Vec<String>,
        summary: Option<String>,
    },
}

impl TourSearchOutcome {
    /// Messages in send order
    pub fn messages(&self) -> Vec<&str> {
        match self {
            TourSearchOutcome::Failed(text) | TourSearchOutcome::Empty(text) => vec![text.as_str()],
            TourSearchOutcome::Found { offers, summary } => offers
                .iter()
                .map(String::as_str)
                .chain(summary.as_deref())
                .collect(),
        }
    }

    pub fn offer_count(&self) -> usize {
        match self {
            TourSearchOutcome::Found { offers, .. } => offers.len(),
            _ => 0,
        }
    }
}

/// Run the search and render its outcome without touching Telegram
pub async fn build_tours_outcome(
    search: &dyn TourSearch,
    ctx: &HandlerContext<'_>,
) -> TourSearchOutcome {
    let tours = match search.search_tours().await {
        Ok(tours) => tours,
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Tour search failed, reporting to user");
            return TourSearchOutcome::Failed(search_error_message(
                &e,
                ctx.localization,
                ctx.language_code,
            ));
        }
    };

    if tours.is_empty() {
        return TourSearchOutcome::Empty(empty_results_message(
            ctx.search_config,
            ctx.localization,
            ctx.language_code,
        ));
    }

    let offers = tours
        .iter()
        .take(MAX_TOURS_TO_SHOW)
        .map(|tour| format_tour_message(tour, ctx.localization, ctx.language_code))
        .collect();

    let summary = (tours.len() > MAX_TOURS_TO_SHOW).then(|| {
        truncated_results_message(
            MAX_TOURS_TO_SHOW,
            tours.len(),
            ctx.localization,
            ctx.language_code,
        )
    });

    TourSearchOutcome::Found { offers, summary }
}

/// Handle the /start and /help commands
pub async fn handle_start_command(ctx: &HandlerContext<'_>, chat_id: ChatId) -> AppResult<()> {
    let text = welcome_message(ctx.search_config, ctx.localization, ctx.language_code);
    send_html(ctx.bot, chat_id, text).await?;
    Ok(())
}

/// Handle the /tours command
pub async fn handle_tours_command(
    ctx: &HandlerContext<'_>,
    chat_id: ChatId,
    search: &dyn TourSearch,
) -> AppResult<()> {
    debug!(chat_id = %chat_id, "Handling /tours command");

    let wait = wait_message(ctx.search_config, ctx.localization, ctx.language_code);
    send_html(ctx.bot, chat_id, wait).await?;

    let outcome = build_tours_outcome(search, ctx).await;
    info!(
        chat_id = %chat_id,
        offers = outcome.offer_count(),
        failed = matches!(outcome, TourSearchOutcome::Failed(_)),
        "Sending tour search results"
    );

    for text in outcome.messages() {
        send_html(ctx.bot, chat_id, text).await?;
    }
    Ok(())
}

/// Handle text that is not a known command.
///
/// Only private chats get the hint; group chatter is ignored.
pub async fn handle_unknown_message(
    bot: &Bot,
    chat: &Chat,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> AppResult<()> {
    let chat_id = chat.id;
    if !chat.is_private() {
        debug!(chat_id = %chat_id, "Ignoring non-command text in a group chat");
        return Ok(());
    }
    debug!(chat_id = %chat_id, "Received text that is not a command");
    let text = t_lang(localization, "unknown-command", language_code);
    send_html(bot, chat_id, text).await?;
    Ok(())
}

async fn send_html(bot: &Bot, chat_id: ChatId, text: impl Into<String>) -> AppResult<Message> {
    let message = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    observability::record_telegram_message("outgoing");
    Ok(message)
}
