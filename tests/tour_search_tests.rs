//! # Tour Search Integration Tests
//!
//! Exercises the provider client against a mock HTTP server: request
//! shape, filtering, skip-on-malformed-item and error propagation.


use mockito::Matcher;
use serde_json::json;
use test_helpers::*;
use tour_finder::errors::AppError;
use tour_finder::tours::TourSearch;

#[cfg(test)]
mod tests {
    use super::*;

    /// Test the request carries route, window, filter and token
    #[tokio::test]
    async fn test_request_parameters_and_token_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("origin".into(), "MOW".into()),
                Matcher::UrlEncoded("destination".into(), "UTP".into()),
                Matcher::UrlEncoded("departure_at".into(), "2026-03-01:2026-03-31".into()),
                Matcher::UrlEncoded("one_way".into(), "false".into()),
                Matcher::UrlEncoded("direct".into(), "true".into()),
                Matcher::UrlEncoded("limit".into(), "30".into()),
                Matcher::UrlEncoded("token".into(), API_TOKEN.into()),
            ]))
            .match_header("x-access-token", API_TOKEN)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(vec![]))
            .create_async()
            .await;

        let tours = client_for(&server.url()).search_tours().await.unwrap();

        mock.assert_async().await;
        assert!(tours.is_empty());
    }

    /// Test every returned tour respects night bounds and direct-only
    #[tokio::test]
    async fn test_filter_invariants_hold() {
        let mut server = mockito::Server::new_async().await;
        let items = (5..=20)
            .flat_map(|nights| {
                vec![
                    flat_item(40_000 + nights as u64, "2026-03-03", nights, 0),
                    flat_item(30_000 + nights as u64, "2026-03-04", nights, 1),
                ]
            })
            .collect();
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(envelope(items))
            .create_async()
            .await;

        let tours = client_for(&server.url()).search_tours().await.unwrap();

        // 10..=15 nights, direct only
        assert_eq!(tours.len(), 6);
        assert!(tours.iter().all(|t| (10..=15).contains(&t.nights)));
        assert!(tours.iter().all(|t| t.flight_is_direct));
        assert!(tours.windows(2).all(|w| w[0].price <= w[1].price));
        assert!(tours.iter().all(|t| t.currency == "rub"));
    }

    /// Test indirect flights are kept when direct-only is off
    #[tokio::test]
    async fn test_indirect_kept_without_direct_only() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::UrlEncoded("direct".into(), "false".into()))
            .with_status(200)
            .with_body(envelope(vec![
                flat_item(40_000, "2026-03-03", 12, 0),
                flat_item(30_000, "2026-03-04", 12, 1),
            ]))
            .create_async()
            .await;

        let mut config = search_config(&server.url());
        config.direct_only = false;
        let client = tour_finder::TourSearchClient::new(config, std::time::Duration::from_secs(5))
            .unwrap();
        let tours = client.search_tours().await.unwrap();

        assert_eq!(tours.len(), 2);
        assert!(!tours[0].flight_is_direct);
        assert_eq!(tours[0].price, 30_000);
    }

    /// Test a malformed item is skipped and the rest survive
    #[tokio::test]
    async fn test_malformed_item_skipped() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "success": true,
            "currency": "rub",
            "data": [
                flat_item(45_000, "2026-03-10", 11, 0),
                {"price": "n/a", "departure_at": "2026-03-11T10:00:00+03:00"},
                42,
                flat_item(52_000, "2026-03-12", 14, 0)
            ]
        })
        .to_string();
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let tours = client_for(&server.url()).search_tours().await.unwrap();

        assert_eq!(tours.len(), 2);
        assert_eq!(tours[0].price, 45_000);
        assert_eq!(tours[0].departure_date, "2026-03-10");
        assert_eq!(tours[0].nights, 11);
        assert_eq!(
            tours[0].url.as_deref(),
            Some("https://www.aviasales.ru/search/MOW45000UTP1?t=SU")
        );
        assert_eq!(tours[1].price, 52_000);
    }

    /// Test a response with no matching flights is an empty list
    #[tokio::test]
    async fn test_no_matching_flights_is_empty_not_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(envelope(vec![flat_item(20_000, "2026-03-10", 3, 0)]))
            .create_async()
            .await;

        let tours = client_for(&server.url()).search_tours().await.unwrap();
        assert!(tours.is_empty());
    }

    /// Test non-2xx responses become API errors
    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"success": false, "error": "Unauthorized"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url()).search_tours().await.unwrap_err();
        match err {
            AppError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unauthorized"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    /// Test a non-JSON body is a parse error
    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", PRICES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(&server.url()).search_tours().await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    /// Test an unreachable provider is a network error
    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let client = client_for("http://127.0.0.1:9");
        let err = client.search_tours().await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(!err.to_string().contains(API_TOKEN));
    }
}
