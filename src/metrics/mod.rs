//! Metrics pipeline: in-memory aggregation plus periodic OTLP push
//!
//! ```text
//! request handlers ──> MetricStore (counters, gauges, latency buffers)
//!                           │ snapshot every interval
//!                           ▼
//!                      MetricExporter ──> OTLP JSON ──> Grafana endpoint
//! ```
//!
//! Counters are cumulative for the process lifetime; only the latency
//! buffers are interval-scoped and drained on every snapshot.

pub mod exporter;
pub mod otlp;
pub mod store;
pub mod system;

pub use exporter::{ExporterHandle, MetricExporter};
pub use store::{LatencyKind, LatencySummary, MetricStore, MetricsSnapshot};
pub use system::{ProcSampler, SystemSampler};
