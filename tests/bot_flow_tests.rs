//! # Bot Flow Tests
//!
//! Tests the `/tours` reply flow without Telegram: how many messages are
//! produced for failures, empty results and long result lists.


use mockito::Matcher;
use std::sync::Arc;
use teloxide::types::Chat;
use teloxide::Bot;
use test_helpers::*;
use tour_finder::bot::command_handlers::handle_unknown_message;
use tour_finder::bot::{build_tours_outcome, HandlerContext, TourSearchOutcome, MAX_TOURS_TO_SHOW};
use tour_finder::config::SearchConfig;
use tour_finder::errors::AppError;
use tour_finder::localization::{create_localization_manager, LocalizationManager};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> Arc<LocalizationManager> {
        create_localization_manager().expect("Failed to create localization manager")
    }

    fn test_bot() -> Bot {
        Bot::new("123456789:AAFakeTokenForTestingPurposes1234567890")
    }

    /// Test at most five offers are rendered, plus a summary
    #[tokio::test]
    async fn test_offer_messages_capped_at_five() {
        let bot = test_bot();
        let localization = setup_localization();
        let config = SearchConfig::default();
        let ctx = HandlerContext {
            bot: &bot,
            search_config: &config,
            localization: &localization,
            language_code: Some("ru"),
        };

        let tours = (1..=8).map(|i| sample_tour(40_000 + i)).collect();
        let outcome = build_tours_outcome(&StaticSearch(Ok(tours)), &ctx).await;

        assert_eq!(outcome.offer_count(), MAX_TOURS_TO_SHOW);
        let messages = outcome.messages();
        assert_eq!(messages.len(), MAX_TOURS_TO_SHOW + 1);
        assert!(messages[0].contains("40 001"));
        assert!(messages[MAX_TOURS_TO_SHOW].contains("Показано 5 лучших вариантов из 8"));
    }

    /// Test no summary when everything fits
    #[tokio::test]
    async fn test_no_summary_when_all_shown() {
        let bot = test_bot();
        let localization = setup_localization();
        let config = SearchConfig::default();
        let ctx = HandlerContext {
            bot: &bot,
            search_config: &config,
            localization: &localization,
            language_code: Some("en"),
        };

        let tours = (1..=MAX_TOURS_TO_SHOW as u64).map(sample_tour).collect();
        let outcome = build_tours_outcome(&StaticSearch(Ok(tours)), &ctx).await;

        match outcome {
            TourSearchOutcome::Found { offers, summary } => {
                assert_eq!(offers.len(), MAX_TOURS_TO_SHOW);
                assert!(summary.is_none());
            }
            other => panic!("expected offers, got {:?}", other),
        }
    }

    /// Test empty results produce one explanatory message
    #[tokio::test]
    async fn test_empty_results_single_message() {
        let bot = test_bot();
        let localization = setup_localization();
        let config = SearchConfig::default();
        let ctx = HandlerContext {
            bot: &bot,
            search_config: &config,
            localization: &localization,
            language_code: None,
        };

        let outcome = build_tours_outcome(&StaticSearch(Ok(vec![])), &ctx).await;

        assert!(matches!(outcome, TourSearchOutcome::Empty(_)));
        let messages = outcome.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("10-15"));
        assert!(messages[0].contains("прямые рейсы"));
    }

    /// Test a search error produces exactly one error message
    #[tokio::test]
    async fn test_search_error_single_message() {
        let bot = test_bot();
        let localization = setup_localization();
        let config = SearchConfig::default();
        let ctx = HandlerContext {
            bot: &bot,
            search_config: &config,
            localization: &localization,
            language_code: Some("en"),
        };

        let search = StaticSearch(Err(AppError::Network("connection reset".to_string())));
        let outcome = build_tours_outcome(&search, &ctx).await;

        assert_eq!(outcome.offer_count(), 0);
        let messages = outcome.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("<code>[NETWORK] connection reset</code>"));
    }

    /// Test a non-2xx provider response ends in one error message and no offers
    #[tokio::test]
    async fn test_provider_failure_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let bot = test_bot();
        let localization = setup_localization();
        let client = client_for(&server.url());
        let ctx = HandlerContext {
            bot: &bot,
            search_config: client.config(),
            localization: &localization,
            language_code: Some("ru"),
        };

        let outcome = build_tours_outcome(&client, &ctx).await;

        assert!(matches!(outcome, TourSearchOutcome::Failed(_)));
        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(outcome.offer_count(), 0);
        assert!(outcome.messages()[0].contains("HTTP 503"));
    }

    /// Test a transport failure never echoes the provider token to the chat
    #[tokio::test]
    async fn test_network_failure_hides_api_token() {
        let bot = test_bot();
        let localization = setup_localization();
        let client = client_for("http://127.0.0.1:9");
        let ctx = HandlerContext {
            bot: &bot,
            search_config: client.config(),
            localization: &localization,
            language_code: Some("en"),
        };

        let outcome = build_tours_outcome(&client, &ctx).await;

        assert!(matches!(outcome, TourSearchOutcome::Failed(_)));
        let messages = outcome.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("[NETWORK]"));
        assert!(!messages[0].contains(API_TOKEN));
        assert!(!messages[0].contains("token="));
    }

    /// Test offers from a real provider response are rendered in price order
    #[tokio::test]
    async fn test_provider_offers_rendered() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(envelope(vec![
                flat_item(71_500, "2026-03-08", 13, 0),
                flat_item(64_200, "2026-03-02", 12, 0),
            ]))
            .create_async()
            .await;

        let bot = test_bot();
        let localization = setup_localization();
        let client = client_for(&server.url());
        let ctx = HandlerContext {
            bot: &bot,
            search_config: client.config(),
            localization: &localization,
            language_code: Some("ru"),
        };

        let outcome = build_tours_outcome(&client, &ctx).await;
        let messages = outcome.messages();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("💰 Цена: 64 200 rub"));
        assert!(messages[0].contains("🌙 Ночей: 12"));
        assert!(messages[1].contains("📅 Вылет: 2026-03-08"));
    }

    /// Test plain text in a group chat gets no reply
    #[tokio::test]
    async fn test_group_chatter_not_answered() {
        // Unroutable API host: any send attempt would surface as an error
        let bot = test_bot().set_api_url(reqwest::Url::parse("http://127.0.0.1:9").unwrap());
        let localization = setup_localization();
        let group: Chat = serde_json::from_value(serde_json::json!({
            "id": -4567890_i64,
            "type": "group",
            "title": "Pattaya trip"
        }))
        .unwrap();

        let result = handle_unknown_message(&bot, &group, &localization, Some("en")).await;
        assert!(result.is_ok());

        let private: Chat = serde_json::from_value(serde_json::json!({
            "id": 42,
            "type": "private",
            "first_name": "Traveller"
        }))
        .unwrap();
        let result = handle_unknown_message(&bot, &private, &localization, Some("en")).await;
        assert!(matches!(result, Err(AppError::Telegram(_))));
    }
}
