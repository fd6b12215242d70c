//! Structured logging pipeline: classify, redact, ship
//!
//! Events flow through three stages:
//! 1. A typed entry point on [`Logger`] builds the payload and derives the
//!    level (HTTP status mapping, factory outcome, always-error).
//! 2. The payload tree is walked and every `password` field masked before
//!    serialization; SQL parameters get their own masking during rendering.
//! 3. The formatted line is handed to a background task that POSTs it to
//!    the Loki-shaped endpoint immediately, fire-and-forget.

pub mod event;
pub mod redact;
pub mod shipper;
pub mod sql;

pub use event::{EventKind, LogLevel, LogPayload};
pub use redact::redact_passwords;
pub use shipper::Logger;
pub use sql::{fill_sql_params, SqlParam};
