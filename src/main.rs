use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tour_finder::bot::{self, BotState};
use tour_finder::config::AppConfig;
use tour_finder::errors::error_logging;
use tour_finder::localization;
use tour_finder::observability;
use tour_finder::tours::{TourSearch, TourSearchClient};
use tracing::info;

/// Load and validate configuration; errors here are fatal
fn load_configuration() -> Result<AppConfig> {
    let config = AppConfig::from_env().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "load_configuration");
        anyhow::anyhow!("{}", e)
    })?;

    config.validate().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "validate_configuration");
        anyhow::anyhow!("{}", e)
    })?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = Arc::new(load_configuration()?);

    // Initialize observability stack (logging, metrics, tracing, health checks)
    let observability_guard = observability::init_observability(Arc::clone(&config)).await?;

    info!(summary = %config.summary(), "Configuration loaded");

    let localization_manager = localization::create_localization_manager()?;

    let http_timeout = Duration::from_secs(config.bot.http_timeout_secs);

    // One provider client and connection pool for the whole process
    let search_client = TourSearchClient::new(config.search.clone(), http_timeout)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let search: Arc<dyn TourSearch> = Arc::new(search_client);

    // Initialize the bot with custom client configuration
    let telegram_client = reqwest::Client::builder()
        .timeout(http_timeout)
        .build()?;
    let telegram_bot = Bot::with_client(config.bot.token.clone(), telegram_client);

    let me = telegram_bot.get_me().await?;
    let bot_username = me.username.clone();

    info!(
        timeout_secs = config.bot.http_timeout_secs,
        username = ?bot_username,
        "Bot initialized, starting dispatcher"
    );

    let state = BotState {
        config: Arc::clone(&config),
        search,
        localization: localization_manager,
        bot_username,
    };

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let state = state.clone();
        move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move { bot::message_handler(bot, msg, state).await }
        }
    }));

    Dispatcher::builder(telegram_bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    // Dropping the state closes the provider connection pool
    drop(state);
    observability_guard.shutdown();

    Ok(())
}
