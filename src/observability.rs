//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels (pretty or JSON)
//! - Metrics collection and Prometheus export
//! - Optional distributed tracing export over OTLP
//! - Health check endpoints for monitoring

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use tokio::net::TcpListener;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use crate::config::AppConfig;
use crate::observability_config::ObservabilityConfig;

/// Keeps exporters alive until shutdown
#[derive(Debug, Default)]
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl ObservabilityGuard {
    /// Flush and stop the trace exporter, if one was started
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to shut down tracer provider");
            }
        }
    }
}

/// Initialize logging, metrics, trace export and the health/metrics server
pub async fn init_observability(app_config: Arc<AppConfig>) -> Result<ObservabilityGuard> {
    let config = &app_config.observability;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    let tracer_provider = init_opentelemetry_tracing_with_config(config)?;
    init_tracing_with_config(config, tracer_provider.as_ref())?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(
            otlp_endpoint = %endpoint,
            trace_sampling_enabled = %config.enable_trace_sampling,
            trace_sampling_ratio = %config.trace_sampling_ratio,
            "OpenTelemetry tracing initialized with OTLP export"
        );
    } else {
        tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)");
    }

    let metrics_handle = if config.enable_metrics_export {
        Some(init_metrics()?)
    } else {
        tracing::info!("Metrics export disabled");
        None
    };

    start_metrics_server_with_health_checks(
        metrics_handle,
        app_config.server.metrics_port,
        Arc::clone(&app_config),
    )
    .await?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_port = %app_config.server.metrics_port,
        "Observability stack initialized successfully"
    );
    Ok(ObservabilityGuard { tracer_provider })
}

/// Initialize structured logging with tracing and configuration.
///
/// When a tracer provider is given, spans are also exported through it.
fn init_tracing_with_config(
    config: &ObservabilityConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("tour_finder={}", config.log_level).parse()?)
        .add_directive("teloxide=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    // Pretty for development, JSON everywhere else
    if config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty"
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .with(otel_layer(tracer_provider))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .with(otel_layer(tracer_provider))
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with Prometheus exporter
fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Layer feeding `tracing` spans into the OpenTelemetry tracer, if any
pub fn otel_layer<S>(
    tracer_provider: Option<&SdkTracerProvider>,
) -> Option<OpenTelemetryLayer<S, SdkTracer>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracer_provider
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("tour-finder")))
}

/// Build the OTLP span exporter when an endpoint is configured.
///
/// Runs before the subscriber exists, so it does not log.
fn init_opentelemetry_tracing_with_config(
    config: &ObservabilityConfig,
) -> Result<Option<SdkTracerProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let mut builder = SdkTracerProvider::builder().with_batch_exporter(exporter);
    if config.enable_trace_sampling {
        builder = builder.with_sampler(Sampler::TraceIdRatioBased(config.trace_sampling_ratio));
    }
    let provider = builder.build();

    global::set_tracer_provider(provider.clone());
    Ok(Some(provider))
}

async fn start_metrics_server_with_health_checks(
    metrics_handle: Option<PrometheusHandle>,
    port: u16,
    app_config: Arc<AppConfig>,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let metrics_handle = metrics_handle.clone();
                    let app_config = Arc::clone(&app_config);

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let app_config = Arc::clone(&app_config);
                                async move {
                                    let response = match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/metrics") => match metrics_handle {
                                            Some(handle) => {
                                                let mut response =
                                                    hyper::Response::new(handle.render());
                                                response.headers_mut().insert(
                                                    "content-type",
                                                    hyper::header::HeaderValue::from_static(
                                                        "text/plain; version=0.0.4; charset=utf-8",
                                                    ),
                                                );
                                                response
                                            }
                                            None => status_response(
                                                hyper::StatusCode::NOT_FOUND,
                                                "Metrics export disabled",
                                            ),
                                        },
                                        (&hyper::Method::GET, "/health/live") => {
                                            hyper::Response::new("OK".to_string())
                                        }
                                        (&hyper::Method::GET, "/health/ready") => {
                                            match perform_readiness_checks(&app_config).await {
                                                Ok(()) => hyper::Response::new("OK".to_string()),
                                                Err(e) => status_response(
                                                    hyper::StatusCode::SERVICE_UNAVAILABLE,
                                                    &format!("NOT READY: {}", e),
                                                ),
                                            }
                                        }
                                        _ => status_response(hyper::StatusCode::NOT_FOUND, "Not Found"),
                                    };
                                    Ok::<_, std::convert::Infallible>(response)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                }
            }
        }
    });

    Ok(())
}

fn status_response(status: hyper::StatusCode, body: &str) -> hyper::Response<String> {
    let mut response = hyper::Response::new(body.to_string());
    *response.status_mut() = status;
    response
}

/// Create a span for Telegram bot operations
pub fn telegram_span(operation: &str, chat_id: i64) -> tracing::Span {
    tracing::info_span!(
        "telegram_operation",
        operation = operation,
        chat_id = chat_id,
        component = "telegram"
    )
}

/// Create a span for provider searches
pub fn search_span(origin: &str, destination: &str) -> tracing::Span {
    tracing::info_span!(
        "tour_search",
        origin = origin,
        destination = destination,
        component = "search"
    )
}

/// Record the outcome of one provider search
pub fn record_search_metrics(success: bool, duration: Duration, tours_found: usize) {
    metrics::counter!("tour_searches_total", "result" => if success { "success" } else { "failure" })
        .increment(1);
    metrics::histogram!("tour_search_duration_seconds").record(duration.as_secs_f64());
    if success {
        metrics::histogram!("tours_found").record(tours_found as f64);
    }
}

/// Record a provider item dropped during mapping
pub fn record_skipped_item(reason: &'static str) {
    metrics::counter!("tour_items_skipped_total", "reason" => reason).increment(1);
}

/// Record Telegram message processing metrics
pub fn record_telegram_message(message_type: &'static str) {
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}

/// Record a recognized bot command
pub fn record_command(command: &'static str) {
    metrics::counter!("telegram_commands_total", "command" => command).increment(1);
}

/// Perform readiness checks against the loaded configuration
pub async fn perform_readiness_checks(config: &AppConfig) -> Result<()> {
    check_bot_token_health(&config.bot.token).await?;
    check_api_token_health(&config.search.api_token).await?;
    Ok(())
}

/// Check the Telegram bot token shape
pub async fn check_bot_token_health(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(anyhow::anyhow!("Bot token is empty"));
    }

    if !token.contains(':') {
        return Err(anyhow::anyhow!("Bot token format is invalid"));
    }

    tracing::debug!("Bot token health check passed");
    Ok(())
}

/// Check that a provider token is present
pub async fn check_api_token_health(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(anyhow::anyhow!("Provider API token is empty"));
    }

    tracing::debug!("Provider token health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bot_token_health() {
        assert!(check_bot_token_health("").await.is_err());
        assert!(check_bot_token_health("no-colon").await.is_err());
        assert!(check_bot_token_health("123:abc").await.is_ok());
    }

    #[tokio::test]
    async fn test_readiness_checks() {
        let mut config = AppConfig::default();
        assert!(perform_readiness_checks(&config).await.is_err());

        config.bot.token = "123456789:AAFakeTokenForTestingPurposes1234567890".to_string();
        assert!(perform_readiness_checks(&config).await.is_err());

        config.search.api_token = "secret".to_string();
        assert!(perform_readiness_checks(&config).await.is_ok());
    }

    #[test]
    fn test_metrics_recording_without_recorder() {
        // Without an installed recorder these are no-ops and must not panic
        record_search_metrics(true, Duration::from_millis(120), 3);
        record_search_metrics(false, Duration::from_millis(10), 0);
        record_skipped_item("missing_field");
        record_telegram_message("text");
        record_command("tours");
    }

    #[test]
    fn test_spans_reach_tracer_provider() {
        use opentelemetry_sdk::trace::InMemorySpanExporter;

        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(Some(&provider)));

        tracing::subscriber::with_default(subscriber, || {
            let span = search_span("MOW", "UTP");
            let _entered = span.enter();
        });
        provider.force_flush().unwrap();

        let names: Vec<String> = exporter
            .get_finished_spans()
            .unwrap()
            .iter()
            .map(|span| span.name.to_string())
            .collect();
        assert_eq!(names, vec!["tour_search".to_string()]);
    }

    #[test]
    fn test_no_layer_without_provider() {
        let layer: Option<OpenTelemetryLayer<tracing_subscriber::Registry, SdkTracer>> =
            otel_layer(None);
        assert!(layer.is_none());
    }
}
