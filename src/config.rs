use serde::{Deserialize, Serialize};

/// Top-level configuration for the telemetry subsystem
///
/// The host service loads this once at startup and hands it to
/// [`crate::track::Telemetry::start`]. Both sinks are Grafana Cloud style
/// push endpoints; credentials come from the environment in deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub metrics: MetricsSinkConfig,
    pub logging: LoggingSinkConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// OTLP-shaped metrics ingestion endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsSinkConfig {
    pub url: String,
    pub api_key: String,
    /// Value of the `source` attribute attached to every exported series
    pub source: String,
    /// Export cycle period
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Loki-shaped log ingestion endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSinkConfig {
    pub url: String,
    pub user_id: String,
    pub api_key: String,
    /// Value of the `component` stream label on every shipped line
    pub source: String,
}

/// Delivery policy shared by both sinks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per payload, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry
    pub base_delay_ms: u64,
    /// Hard per-attempt timeout
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            timeout_secs: 10,
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

pub fn load_config() -> anyhow::Result<TelemetryConfig> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("telemetry").required(false))
        .add_source(config::Environment::with_prefix("PIZZA_TELEMETRY").separator("__"))
        .build()?;

    let cfg: TelemetryConfig = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &TelemetryConfig) -> anyhow::Result<()> {
    if cfg.metrics.url.is_empty() {
        anyhow::bail!("Metrics sink URL cannot be empty");
    }
    if cfg.metrics.api_key.is_empty() {
        anyhow::bail!("Metrics sink API key cannot be empty");
    }
    if cfg.metrics.source.is_empty() {
        anyhow::bail!("Metrics source label cannot be empty");
    }
    if cfg.metrics.interval_secs == 0 {
        anyhow::bail!("Metrics export interval must be at least 1 second");
    }

    if cfg.logging.url.is_empty() {
        anyhow::bail!("Logging sink URL cannot be empty");
    }
    if cfg.logging.user_id.is_empty() || cfg.logging.api_key.is_empty() {
        anyhow::bail!("Logging sink credentials cannot be empty");
    }
    if cfg.logging.source.is_empty() {
        anyhow::bail!("Logging component label cannot be empty");
    }

    if cfg.retry.max_attempts == 0 {
        anyhow::bail!("Retry policy needs at least one attempt");
    }

    Ok(())
}
