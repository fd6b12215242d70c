//! Periodic metric export
//!
//! Every interval the exporter snapshots the [`MetricStore`], renders one
//! OTLP envelope, and POSTs it to the ingestion endpoint. A failed push is
//! logged and swallowed; it never delays or skips the next tick, and the
//! latency buffers are already drained by the snapshot either way.

use crate::config::MetricsSinkConfig;
use crate::error::TelemetryError;
use crate::metrics::otlp::{ExportMetricsRequest, KeyValue, Metric};
use crate::metrics::store::{LatencySummary, MetricStore, MetricsSnapshot};
use crate::metrics::system::SystemSampler;
use crate::transport::PushClient;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::time;

pub struct MetricExporter {
    store: Arc<MetricStore>,
    sampler: Arc<dyn SystemSampler>,
    client: PushClient,
    config: MetricsSinkConfig,
}

/// Cancel handle for the export loop
///
/// Dropping the handle leaves the loop running for the process lifetime;
/// calling [`Self::shutdown`] stops it deterministically.
pub struct ExporterHandle {
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl ExporterHandle {
    /// Stop the export loop and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl MetricExporter {
    pub fn new(
        store: Arc<MetricStore>,
        sampler: Arc<dyn SystemSampler>,
        client: PushClient,
        config: MetricsSinkConfig,
    ) -> Self {
        Self {
            store,
            sampler,
            client,
            config,
        }
    }

    /// Spawn the periodic export loop
    pub fn spawn(self: Arc<Self>) -> ExporterHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // tokio intervals fire at t=0; consume that tick so the first
            // export covers a full window
            ticker.tick().await;

            let shutdown = wait_for_shutdown(shutdown_rx);
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.export_once().await {
                            tracing::error!(error = %e, "failed to push metrics batch");
                        }
                    }
                    _ = &mut shutdown => {
                        tracing::debug!("metric exporter shutting down");
                        break;
                    }
                }
            }
        });

        ExporterHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Run one export cycle: snapshot, build the batch, push it
    ///
    /// The snapshot drains the latency buffers before the send, so a failed
    /// push still leaves them empty for the next interval.
    pub async fn export_once(&self) -> Result<(), TelemetryError> {
        let snapshot = self.store.snapshot();
        let batch = self.build_batch(&snapshot, now_unix_nanos());
        let body = ExportMetricsRequest::new(batch);

        self.client
            .post_json(&self.config.url, &self.config.api_key, &body)
            .await
    }

    /// Render a snapshot into the flat metric list for one envelope
    pub fn build_batch(&self, snapshot: &MetricsSnapshot, now_nanos: u64) -> Vec<Metric> {
        let mut batch = BatchBuilder {
            source: &self.config.source,
            now_nanos,
            metrics: Vec::new(),
        };

        for (method, count) in &snapshot.requests_by_method {
            batch.sum_int("requests", "1", *count as i64, &[("method", method)]);
        }
        batch.sum_int("totalRequests", "1", snapshot.total_requests as i64, &[]);
        batch.gauge_int("activeUsers", "1", snapshot.active_users as i64, &[]);

        if let Some(cpu) = self.sampler.cpu_usage_percent() {
            batch.gauge_double("cpuUsagePercent", "percent", cpu, &[]);
        }
        if let Some(memory) = self.sampler.memory_usage_percent() {
            batch.gauge_double("memoryUsagePercent", "percent", memory, &[]);
        }

        batch.sum_int("orders", "1", snapshot.orders as i64, &[]);
        batch.sum_int("pizzasSold", "1", snapshot.pizzas_sold as i64, &[]);
        batch.sum_double("revenue", "usd", snapshot.revenue, &[]);
        batch.sum_int("failedOrders", "1", snapshot.failed_orders as i64, &[]);

        batch.sum_int(
            "authenticationAttempts",
            "1",
            snapshot.auth_successes as i64,
            &[("status", "successful")],
        );
        batch.sum_int(
            "authenticationAttempts",
            "1",
            snapshot.auth_failures as i64,
            &[("status", "failed")],
        );

        // Latency series only exist for intervals that saw samples; an idle
        // interval emits neither value rather than a misleading zero
        push_latency(&mut batch, "requestLatency", snapshot.request_latency);
        push_latency(&mut batch, "factoryLatency", snapshot.factory_latency);

        batch.metrics
    }
}

/// Resolves only on an explicit shutdown signal
///
/// A dropped sender closes the channel without signalling; that must leave
/// the export loop running, so the closed case parks forever instead of
/// resolving.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

fn push_latency(batch: &mut BatchBuilder<'_>, name: &str, summary: Option<LatencySummary>) {
    if let Some(summary) = summary {
        batch.gauge_double(name, "ms", summary.last, &[]);
        batch.gauge_double(&format!("{}Avg", name), "ms", summary.average, &[]);
    }
}

/// Accumulates one interval's metrics, stamping each data point with the
/// shared timestamp and the configured source attribute
struct BatchBuilder<'a> {
    source: &'a str,
    now_nanos: u64,
    metrics: Vec<Metric>,
}

impl BatchBuilder<'_> {
    fn attributes(&self, extra: &[(&str, &str)]) -> Vec<KeyValue> {
        let mut attributes: Vec<KeyValue> = extra
            .iter()
            .map(|(key, value)| KeyValue::string(key, *value))
            .collect();
        attributes.push(KeyValue::string("source", self.source));
        attributes
    }

    fn sum_int(&mut self, name: &str, unit: &str, value: i64, extra: &[(&str, &str)]) {
        let attributes = self.attributes(extra);
        self.metrics
            .push(Metric::sum_int(name, unit, value, self.now_nanos, attributes));
    }

    fn sum_double(&mut self, name: &str, unit: &str, value: f64, extra: &[(&str, &str)]) {
        let attributes = self.attributes(extra);
        self.metrics.push(Metric::sum_double(
            name,
            unit,
            value,
            self.now_nanos,
            attributes,
        ));
    }

    fn gauge_int(&mut self, name: &str, unit: &str, value: i64, extra: &[(&str, &str)]) {
        let attributes = self.attributes(extra);
        self.metrics.push(Metric::gauge_int(
            name,
            unit,
            value,
            self.now_nanos,
            attributes,
        ));
    }

    fn gauge_double(&mut self, name: &str, unit: &str, value: f64, extra: &[(&str, &str)]) {
        let attributes = self.attributes(extra);
        self.metrics.push(Metric::gauge_double(
            name,
            unit,
            value,
            self.now_nanos,
            attributes,
        ));
    }
}

fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetricsSinkConfig, RetryConfig};
    use crate::metrics::store::LatencyKind;

    struct FixedSampler {
        cpu: Option<f64>,
        memory: Option<f64>,
    }

    impl SystemSampler for FixedSampler {
        fn cpu_usage_percent(&self) -> Option<f64> {
            self.cpu
        }

        fn memory_usage_percent(&self) -> Option<f64> {
            self.memory
        }
    }

    fn test_exporter(store: Arc<MetricStore>, sampler: FixedSampler) -> MetricExporter {
        MetricExporter::new(
            store,
            Arc::new(sampler),
            PushClient::new(RetryConfig::default()),
            MetricsSinkConfig {
                url: "http://localhost/v1/metrics".to_string(),
                api_key: "key".to_string(),
                source: "jwt-pizza-service".to_string(),
                interval_secs: 10,
            },
        )
    }

    fn find<'a>(batch: &'a [Metric], name: &str) -> Vec<&'a Metric> {
        batch.iter().filter(|m| m.name == name).collect()
    }

    #[test]
    fn test_batch_contains_per_method_sums() {
        let store = Arc::new(MetricStore::new());
        store.track_request("GET");
        store.track_request("GET");
        store.track_request("POST");

        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: None,
                memory: None,
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        let requests = find(&batch, "requests");
        assert_eq!(requests.len(), 2);

        let get = requests[0].sum.as_ref().unwrap();
        assert_eq!(get.data_points[0].as_int, Some(2));
        assert_eq!(get.data_points[0].attributes[0].value.string_value, "GET");

        let post = requests[1].sum.as_ref().unwrap();
        assert_eq!(post.data_points[0].as_int, Some(1));
        assert_eq!(post.data_points[0].attributes[0].value.string_value, "POST");

        let total = find(&batch, "totalRequests");
        assert_eq!(total[0].sum.as_ref().unwrap().data_points[0].as_int, Some(3));
    }

    #[test]
    fn test_batch_omits_system_gauges_when_sampling_fails() {
        let store = Arc::new(MetricStore::new());
        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: None,
                memory: None,
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        assert!(find(&batch, "cpuUsagePercent").is_empty());
        assert!(find(&batch, "memoryUsagePercent").is_empty());
    }

    #[test]
    fn test_batch_includes_system_gauges_when_sampled() {
        let store = Arc::new(MetricStore::new());
        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: Some(31.0),
                memory: Some(66.67),
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        let cpu = find(&batch, "cpuUsagePercent");
        assert_eq!(
            cpu[0].gauge.as_ref().unwrap().data_points[0].as_double,
            Some(31.0)
        );
    }

    #[test]
    fn test_batch_omits_latency_without_samples() {
        let store = Arc::new(MetricStore::new());
        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: None,
                memory: None,
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        assert!(find(&batch, "requestLatency").is_empty());
        assert!(find(&batch, "requestLatencyAvg").is_empty());
        assert!(find(&batch, "factoryLatency").is_empty());
    }

    #[test]
    fn test_batch_latency_last_and_average() {
        let store = Arc::new(MetricStore::new());
        store.observe_latency(10.0, LatencyKind::Request);
        store.observe_latency(30.0, LatencyKind::Request);

        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: None,
                memory: None,
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        let last = find(&batch, "requestLatency");
        assert_eq!(
            last[0].gauge.as_ref().unwrap().data_points[0].as_double,
            Some(30.0)
        );
        let average = find(&batch, "requestLatencyAvg");
        assert_eq!(
            average[0].gauge.as_ref().unwrap().data_points[0].as_double,
            Some(20.0)
        );
    }

    #[test]
    fn test_every_data_point_carries_source_attribute() {
        let store = Arc::new(MetricStore::new());
        store.track_request("GET");
        store.record_auth_attempt(true);

        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: Some(1.0),
                memory: Some(1.0),
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        for metric in &batch {
            let points = match (&metric.sum, &metric.gauge) {
                (Some(sum), _) => &sum.data_points,
                (_, Some(gauge)) => &gauge.data_points,
                _ => panic!("metric {} has neither sum nor gauge", metric.name),
            };
            let has_source = points[0]
                .attributes
                .iter()
                .any(|kv| kv.key == "source" && kv.value.string_value == "jwt-pizza-service");
            assert!(has_source, "metric {} is missing the source attribute", metric.name);
        }
    }

    #[test]
    fn test_auth_attempt_series_split_by_status() {
        let store = Arc::new(MetricStore::new());
        store.record_auth_attempt(true);
        store.record_auth_attempt(false);
        store.record_auth_attempt(false);

        let exporter = test_exporter(
            store.clone(),
            FixedSampler {
                cpu: None,
                memory: None,
            },
        );
        let batch = exporter.build_batch(&store.snapshot(), 1);

        let attempts = find(&batch, "authenticationAttempts");
        assert_eq!(attempts.len(), 2);

        let successful = attempts[0].sum.as_ref().unwrap();
        assert_eq!(successful.data_points[0].as_int, Some(1));
        assert_eq!(
            successful.data_points[0].attributes[0].value.string_value,
            "successful"
        );

        let failed = attempts[1].sum.as_ref().unwrap();
        assert_eq!(failed.data_points[0].as_int, Some(2));
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let store = Arc::new(MetricStore::new());
        let exporter = Arc::new(test_exporter(
            store,
            FixedSampler {
                cpu: None,
                memory: None,
            },
        ));

        let handle = exporter.spawn();
        handle.shutdown().await;
    }
}
