//! Collaborator-facing tracking hooks
//!
//! The routing layer, auth layer, database layer, and factory client are all
//! external to this crate; they report into it through [`Telemetry`]. Every
//! hook is synchronous, infallible, and cheap — the slow parts (network
//! sends) happen on background tasks.

use crate::config::TelemetryConfig;
use crate::logging::shipper::Logger;
use crate::logging::sql::SqlParam;
use crate::logging::LogPayload;
use crate::metrics::exporter::{ExporterHandle, MetricExporter};
use crate::metrics::store::{LatencyKind, MetricStore};
use crate::metrics::system::ProcSampler;
use crate::transport::PushClient;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Shared handle bundling the metric hooks and the log entry points
#[derive(Clone)]
pub struct Telemetry {
    metrics: Arc<MetricStore>,
    logger: Logger,
}

impl Telemetry {
    /// Wire up the store, the log shipper, and the periodic metric exporter
    ///
    /// Returns the facade plus the exporter's cancel handle; call
    /// [`ExporterHandle::shutdown`] during teardown to stop the export loop
    /// deterministically.
    pub fn start(config: TelemetryConfig) -> (Self, ExporterHandle) {
        let store = Arc::new(MetricStore::new());
        let client = PushClient::new(config.retry.clone());
        let logger = Logger::spawn(client.clone(), config.logging);

        let exporter = Arc::new(MetricExporter::new(
            store.clone(),
            Arc::new(ProcSampler),
            client,
            config.metrics,
        ));
        let handle = exporter.spawn();

        (
            Self {
                metrics: store,
                logger,
            },
            handle,
        )
    }

    /// Assemble a facade from pre-built parts (tests, custom wiring)
    pub fn new(metrics: Arc<MetricStore>, logger: Logger) -> Self {
        Self { metrics, logger }
    }

    pub fn metrics(&self) -> &MetricStore {
        &self.metrics
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Per-request hook: method + total counters, latency sample, access log
    #[allow(clippy::too_many_arguments)]
    pub fn track_request(
        &self,
        method: &str,
        path: &str,
        status: u16,
        authorized: bool,
        req_body: Option<Value>,
        res_body: Option<Value>,
        duration_ms: f64,
    ) {
        self.metrics.track_request(method);
        self.metrics.observe_latency(duration_ms, LatencyKind::Request);

        let payload = LogPayload {
            authorized: Some(authorized),
            path: Some(path.to_string()),
            method: Some(method.to_string()),
            status_code: Some(status),
            req_body,
            res_body,
        };
        self.logger.http_access(&payload);
    }

    /// Per-login-attempt outcome
    pub fn auth_attempt(&self, success: bool) {
        self.metrics.record_auth_attempt(success);
    }

    pub fn user_connected(&self) {
        self.metrics.user_connected();
    }

    pub fn user_disconnected(&self) {
        self.metrics.user_disconnected();
    }

    pub fn order_placed(&self, items: u64, revenue: f64) {
        self.metrics.record_order(items, revenue);
    }

    pub fn order_failed(&self) {
        self.metrics.record_failed_order();
    }

    /// Pizza-factory round trip: latency sample plus outcome log line
    pub fn factory_request(
        &self,
        status: u16,
        duration_ms: f64,
        req_body: Option<Value>,
        res_body: Option<Value>,
    ) {
        self.metrics
            .observe_latency(duration_ms, LatencyKind::Factory);
        self.logger.factory_request(status, req_body, res_body);
    }

    /// Per-query hook from the database layer
    pub fn db_query(&self, sql: &str, params: &[SqlParam]) {
        self.logger.db_query(sql, params);
    }

    /// Uncaught handler failure
    pub fn unhandled_error(&self, status: u16, message: &str, stacktrace: &str) {
        self.logger.unhandled_error(status, message, stacktrace);
    }
}

/// Bodies a handler chose to expose on the access log line
///
/// Body capture stays with the service layer: handlers that buffer their
/// bodies insert this into the response extensions and the middleware picks
/// it up. Requests without it still get counted and logged, just without
/// body fields.
#[derive(Debug, Clone, Default)]
pub struct CapturedBodies {
    pub request: Option<Value>,
    pub response: Option<Value>,
}

/// Axum middleware: counts the request, samples its latency, and emits the
/// access log line once the response is ready
pub async fn track_http(
    State(telemetry): State<Telemetry>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let authorized = request.headers().contains_key("Authorization");
    let started = Instant::now();

    let response = next.run(request).await;

    let bodies = response
        .extensions()
        .get::<CapturedBodies>()
        .cloned()
        .unwrap_or_default();
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    telemetry.track_request(
        &method,
        &path,
        response.status().as_u16(),
        authorized,
        bodies.request,
        bodies.response,
        duration_ms,
    );

    response
}
