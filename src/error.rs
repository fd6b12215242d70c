use thiserror::Error;

/// Telemetry subsystem error types
///
/// None of these ever reach the request/response path of the host service.
/// Callers log the failure through the diagnostic channel and move on; the
/// worst case is a missing log line or a skipped metric interval.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Ingestion endpoint answered with a non-2xx status
    #[error("endpoint returned HTTP {status}: {message}")]
    Endpoint { status: u16, message: String },

    /// Network-level failure talking to an ingestion endpoint
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl TelemetryError {
    /// True when another delivery attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Endpoint { status, .. } => *status >= 500 || *status == 429,
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Serialize(_) => false,
            Self::Config(_) => false,
        }
    }
}
