//! Travelpayouts (Aviasales) `prices_for_dates` client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, Instrument};

use super::mapping::{map_flight, MappingContext};
use super::{Tour, TourSearch};
use crate::config::SearchConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;

/// Currency assumed when the response envelope does not name one
pub const DEFAULT_CURRENCY: &str = "EUR";

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Response envelope; items stay untyped until [`map_flight`]
#[derive(Debug, Deserialize)]
struct PricesEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// HTTP client for the flight pricing API.
///
/// Holds one `reqwest::Client`, so the connection pool is shared by every
/// chat that runs `/tours`.
#[derive(Debug, Clone)]
pub struct TourSearchClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl TourSearchClient {
    /// Build a client with the access token header and a fixed request timeout
    pub fn new(config: SearchConfig, timeout: Duration) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token = HeaderValue::from_str(&config.api_token)
            .map_err(|_| AppError::Config("AVIASALES_TOKEN contains invalid characters".to_string()))?;
        headers.insert("X-Access-Token", token);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Query parameters for one aggregate search over the configured window
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("origin", self.config.origin.clone()),
            ("destination", self.config.destination.clone()),
            ("departure_at", self.config.departure_window()),
            ("one_way", "false".to_string()),
            ("direct", self.config.direct_only.to_string()),
            ("sorting", "price".to_string()),
            ("limit", self.config.result_limit.to_string()),
            // The provider also accepts the token as a query parameter
            ("token", self.config.api_token.clone()),
        ]
    }

    /// Turn a successful response body into filtered tours, cheapest first.
    ///
    /// Items that fail to map are logged and skipped; the rest are kept.
    pub fn parse_response(&self, body: &str) -> AppResult<Vec<Tour>> {
        let envelope: PricesEnvelope = serde_json::from_str(body)?;

        if envelope.success == Some(false) {
            return Err(AppError::Api {
                status: 200,
                body: envelope
                    .error
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            });
        }

        let items = match envelope.data {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(AppError::Parse(format!(
                    "expected 'data' to be an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let currency = envelope
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let ctx = MappingContext {
            currency: &currency,
            link_base: &self.config.link_base,
            origin: &self.config.origin,
            destination: &self.config.destination,
        };
        let filter = self.config.filter();

        let mut tours = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match map_flight(item, &ctx) {
                Ok(tour) if filter.accepts(&tour) => tours.push(tour),
                Ok(tour) => {
                    debug!(
                        item_index = index,
                        nights = tour.nights,
                        direct = tour.flight_is_direct,
                        "Offer rejected by filter"
                    );
                }
                Err(e) => {
                    error_logging::log_skipped_item(&e, index, e.reason());
                    observability::record_skipped_item(e.reason());
                }
            }
        }

        tours.sort_by_key(|tour| tour.price);

        debug!(
            received = items.len(),
            kept = tours.len(),
            "Provider response mapped"
        );
        Ok(tours)
    }

    async fn fetch(&self) -> AppResult<Vec<Tour>> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&self.query_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        self.parse_response(&body)
    }
}

#[async_trait]
impl TourSearch for TourSearchClient {
    async fn search_tours(&self) -> AppResult<Vec<Tour>> {
        let span = observability::search_span(&self.config.origin, &self.config.destination);
        async {
            let start = Instant::now();
            let result = self.fetch().await;
            let duration = start.elapsed();

            match &result {
                Ok(tours) => {
                    info!(
                        tours_found = tours.len(),
                        duration_ms = duration.as_millis() as u64,
                        "Tour search completed"
                    );
                    observability::record_search_metrics(true, duration, tours.len());
                }
                Err(e) => {
                    error_logging::log_network_error(
                        e,
                        "search_tours",
                        Some(self.config.base_url.as_str()),
                        None,
                    );
                    observability::record_search_metrics(false, duration, 0);
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
