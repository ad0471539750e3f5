//! # Production Configuration
//!
//! Environment-specific configuration for observability features
//! in production deployments.

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// OTLP endpoint for trace export
    pub otlp_endpoint: Option<String>,
    /// Log level for the bot's own targets
    pub log_level: String,
    /// Whether to enable trace sampling
    pub enable_trace_sampling: bool,
    /// Trace sampling ratio (0.0-1.0)
    pub trace_sampling_ratio: f64,
    /// Whether to install the Prometheus recorder and serve `/metrics`
    pub enable_metrics_export: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            enable_trace_sampling: false,
            trace_sampling_ratio: 1.0,
            enable_metrics_export: true,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_source<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|e| !e.trim().is_empty()),
            log_level: lookup("OBSERVABILITY_LOG_LEVEL").unwrap_or(defaults.log_level),
            enable_trace_sampling: lookup("ENABLE_TRACE_SAMPLING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_trace_sampling),
            trace_sampling_ratio: lookup("TRACE_SAMPLING_RATIO")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.trace_sampling_ratio),
            enable_metrics_export: lookup("ENABLE_METRICS_EXPORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_metrics_export),
        }
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid OTLP endpoint format: {}", endpoint));
            }
        }

        if !(0.0..=1.0).contains(&self.trace_sampling_ratio) {
            return Err(format!(
                "Invalid trace sampling ratio: {}",
                self.trace_sampling_ratio
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.log_level.as_str()) {
            return Err(format!("Invalid log level: {}", self.log_level));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_level, "info");
        assert!(!config.enable_trace_sampling);
        assert_eq!(config.trace_sampling_ratio, 1.0);
        assert!(config.enable_metrics_export);
    }

    #[test]
    fn test_from_source_parses_values() {
        let config = ObservabilityConfig::from_source(&|key: &str| match key {
            "ENVIRONMENT" => Some("production".to_string()),
            "OTLP_ENDPOINT" => Some("http://collector:4317".to_string()),
            "TRACE_SAMPLING_RATIO" => Some("0.25".to_string()),
            "ENABLE_METRICS_EXPORT" => Some("not-a-bool".to_string()),
            _ => None,
        });
        assert_eq!(config.environment, "production");
        assert!(!config.is_development());
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.trace_sampling_ratio, 0.25);
        // Unparsable values fall back to defaults
        assert!(config.enable_metrics_export);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        config.otlp_endpoint = Some("invalid-endpoint".to_string());
        assert!(config.validate().is_err());

        config.otlp_endpoint = None;
        config.trace_sampling_ratio = 1.5;
        assert!(config.validate().is_err());

        config.trace_sampling_ratio = 1.0;
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
