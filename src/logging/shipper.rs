//! Loki-shaped log shipping
//!
//! [`Logger`] formats and redacts an event synchronously, then hands it to a
//! background task over an unbounded channel. Each entry becomes one
//! immediate POST (no batching). The caller never waits and never sees a
//! failure; a rejected or lost envelope is reported on the diagnostic
//! channel only.

use crate::config::LoggingSinkConfig;
use crate::error::TelemetryError;
use crate::logging::event::{EventKind, LogLevel, LogPayload};
use crate::logging::redact::redact_passwords;
use crate::logging::sql::{fill_sql_params, SqlParam};
use crate::transport::PushClient;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Loki push envelope: one stream carrying one value per shipped entry
#[derive(Debug, Serialize)]
pub struct LogBatch {
    pub streams: Vec<LogStream>,
}

#[derive(Debug, Serialize)]
pub struct LogStream {
    pub stream: StreamLabels,
    /// Pairs of nanosecond-epoch timestamp and serialized payload
    pub values: Vec<[String; 2]>,
}

#[derive(Debug, Serialize)]
pub struct StreamLabels {
    pub component: String,
    pub level: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug)]
struct LogEntry {
    level: LogLevel,
    kind: EventKind,
    timestamp_nanos: String,
    payload: String,
}

/// Non-blocking shipper handle
///
/// Cheap to clone; dropping every clone closes the channel and ends the
/// background task.
#[derive(Clone)]
pub struct Logger {
    sender: mpsc::UnboundedSender<LogEntry>,
}

impl Logger {
    /// Spawn the shipping task and return the handle that feeds it
    pub fn spawn(client: PushClient, config: LoggingSinkConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            shipper_task(client, config, rx).await;
        });

        Self { sender: tx }
    }

    /// Format, redact, and queue one log event (never blocks, never fails)
    pub fn log(&self, level: LogLevel, kind: EventKind, payload: &LogPayload) {
        let entry = match format_entry(level, kind, payload) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize log payload");
                return;
            }
        };
        let _ = self.sender.send(entry);
    }

    /// One line per handled HTTP request; level derives from the status code
    pub fn http_access(&self, payload: &LogPayload) {
        let status = payload.status_code.unwrap_or(200);
        self.log(LogLevel::from_status(status), EventKind::HttpAccess, payload);
    }

    /// Parameterized query rendered to readable SQL, credentials masked
    pub fn db_query(&self, sql: &str, params: &[SqlParam]) {
        let payload = LogPayload {
            req_body: Some(Value::String(fill_sql_params(sql, params))),
            ..Default::default()
        };
        self.log(LogLevel::Info, EventKind::DbQuery, &payload);
    }

    /// Outcome of a pizza-factory order submission
    pub fn factory_request(&self, status: u16, req_body: Option<Value>, res_body: Option<Value>) {
        let payload = LogPayload {
            path: Some("/api/order".to_string()),
            method: Some("POST".to_string()),
            status_code: Some(status),
            req_body,
            res_body,
            ..Default::default()
        };
        let level = if status == 200 {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        self.log(level, EventKind::FactoryRequest, &payload);
    }

    /// Uncaught handler failure; the stacktrace rides in the path field
    pub fn unhandled_error(&self, status: u16, message: &str, stacktrace: &str) {
        let payload = LogPayload {
            path: Some(stacktrace.to_string()),
            status_code: Some(status),
            res_body: Some(serde_json::json!({ "message": message })),
            ..Default::default()
        };
        self.log(LogLevel::Error, EventKind::UnhandledError, &payload);
    }
}

fn format_entry(
    level: LogLevel,
    kind: EventKind,
    payload: &LogPayload,
) -> Result<LogEntry, TelemetryError> {
    let mut value = serde_json::to_value(payload)?;
    redact_passwords(&mut value);

    Ok(LogEntry {
        level,
        kind,
        timestamp_nanos: now_nanos_string(),
        payload: serde_json::to_string(&value)?,
    })
}

/// Millisecond wall clock scaled to nanoseconds, as the endpoint expects
fn now_nanos_string() -> String {
    (Utc::now().timestamp_millis() * 1_000_000).to_string()
}

async fn shipper_task(
    client: PushClient,
    config: LoggingSinkConfig,
    mut rx: mpsc::UnboundedReceiver<LogEntry>,
) {
    let bearer = format!("{}:{}", config.user_id, config.api_key);

    while let Some(entry) = rx.recv().await {
        let batch = LogBatch {
            streams: vec![LogStream {
                stream: StreamLabels {
                    component: config.source.clone(),
                    level: entry.level.as_str().to_string(),
                    kind: entry.kind.as_str().to_string(),
                },
                values: vec![[entry.timestamp_nanos, entry.payload]],
            }],
        };

        if let Err(e) = client.post_json(&config.url, &bearer, &batch).await {
            tracing::warn!(error = %e, "failed to ship log entry");
        }
    }

    tracing::debug!("log shipper task shutting down");
}
