//! Structured log event model

use serde::Serialize;
use serde_json::Value;

/// Severity attached to a shipped log line via the `level` stream label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// HTTP status to level: 5xx is error, 4xx is warn, everything else info
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            Self::Error
        } else if status >= 400 {
            Self::Warn
        } else {
            Self::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Classification of a log event, shipped as the `type` stream label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    HttpAccess,
    DbQuery,
    FactoryRequest,
    UnhandledError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpAccess => "http",
            Self::DbQuery => "db query",
            Self::FactoryRequest => "factory request",
            Self::UnhandledError => "unhandled error",
        }
    }
}

/// Payload carried by every shipped log line
///
/// Fields that do not apply to a given event kind serialize as `null` so
/// every line has the same shape for downstream querying.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    pub authorized: Option<bool>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub req_body: Option<Value>,
    pub res_body: Option<Value>,
}
