//! HTTP push client shared by the metric exporter and the log shipper
//!
//! Both ingestion endpoints speak plain JSON-over-POST with a bearer token.
//! Every send gets a hard per-attempt timeout and a bounded number of
//! attempts with exponential backoff; errors that cannot succeed on a retry
//! (4xx from the endpoint, serialization problems) fail fast.

use crate::config::RetryConfig;
use crate::error::TelemetryError;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PushClient {
    client: Client,
    retry: RetryConfig,
}

impl PushClient {
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            retry,
        }
    }

    /// POST a JSON body with bearer auth, retrying transient failures
    ///
    /// Backoff doubles after each failed attempt (base, 2x, 4x, ...). The
    /// final error is returned so the caller can report it; callers in this
    /// crate log it and continue.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        body: &T,
    ) -> Result<(), TelemetryError> {
        let mut delay = Duration::from_millis(self.retry.base_delay_ms);
        let mut attempt = 1;

        loop {
            match self.try_post(url, bearer, body).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.retry.max_attempts || !e.is_retryable() => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(
                        attempt = attempt,
                        error = %e,
                        "push attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }

    async fn try_post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        body: &T,
    ) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.retry.timeout_secs))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TelemetryError::Endpoint { status, message });
        }

        Ok(())
    }
}
