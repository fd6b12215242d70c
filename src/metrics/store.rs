//! In-process metric state
//!
//! One [`MetricStore`] per process, created by the host service and shared
//! with every request handler behind an `Arc`. Mutations are infallible and
//! lock-light: scalar counters are atomics, the per-method map is a
//! `DashMap`, and only the latency buffers take a mutex.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Which latency series a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatencyKind {
    /// End-to-end handling of an inbound HTTP request
    Request,
    /// Round trip to the pizza factory service
    Factory,
}

/// Summary of one interval's latency samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    /// Most recently recorded value
    pub last: f64,
    /// Arithmetic mean over the interval
    pub average: f64,
}

impl LatencySummary {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        let last = *samples.last()?;
        let average = samples.iter().sum::<f64>() / samples.len() as f64;
        Some(Self { last, average })
    }
}

/// Point-in-time view of every series, taken once per export cycle
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Sorted (method, count) pairs for every method observed so far
    pub requests_by_method: Vec<(String, u64)>,
    pub total_requests: u64,
    pub active_users: u64,
    pub auth_successes: u64,
    pub auth_failures: u64,
    pub orders: u64,
    pub pizzas_sold: u64,
    pub failed_orders: u64,
    pub revenue: f64,
    /// Present only when at least one sample landed this interval
    pub request_latency: Option<LatencySummary>,
    pub factory_latency: Option<LatencySummary>,
}

/// Process-wide counters, gauges, and latency buffers
///
/// Counters are cumulative: they only reset at process restart. The latency
/// buffers are the one interval-scoped piece of state; [`Self::snapshot`]
/// drains them.
#[derive(Debug, Default)]
pub struct MetricStore {
    requests_by_method: DashMap<String, u64>,
    total_requests: AtomicU64,
    active_users: AtomicU64,
    auth_successes: AtomicU64,
    auth_failures: AtomicU64,
    orders: AtomicU64,
    pizzas_sold: AtomicU64,
    failed_orders: AtomicU64,
    revenue: Mutex<f64>,
    request_latency: Mutex<Vec<f64>>,
    factory_latency: Mutex<Vec<f64>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one handled HTTP request
    ///
    /// The per-method counter and the grand total move in the same call so
    /// an export snapshot never sees a method count without its total.
    pub fn track_request(&self, method: &str) {
        *self
            .requests_by_method
            .entry(method.to_string())
            .or_insert(0) += 1;
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump the grand total without a method attribution
    pub fn increment_total(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn user_connected(&self) {
        self.active_users.fetch_add(1, Ordering::Relaxed);
    }

    /// Clamped at zero: disconnecting more users than ever connected is a
    /// no-op, not an underflow
    pub fn user_disconnected(&self) {
        let _ = self
            .active_users
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn record_auth_attempt(&self, success: bool) {
        if success {
            self.auth_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.auth_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_order(&self, items: u64, revenue: f64) {
        self.orders.fetch_add(1, Ordering::Relaxed);
        self.pizzas_sold.fetch_add(items, Ordering::Relaxed);
        if let Ok(mut total) = self.revenue.lock() {
            *total += revenue;
        }
    }

    pub fn record_failed_order(&self) {
        self.failed_orders.fetch_add(1, Ordering::Relaxed);
    }

    /// Append one latency sample to the interval buffer for `kind`
    pub fn observe_latency(&self, duration_ms: f64, kind: LatencyKind) {
        let buffer = match kind {
            LatencyKind::Request => &self.request_latency,
            LatencyKind::Factory => &self.factory_latency,
        };
        if let Ok(mut samples) = buffer.lock() {
            samples.push(duration_ms);
        }
    }

    /// Read every series and drain the latency buffers
    ///
    /// Buffers are swapped out under the lock and summarized on the detached
    /// copy, so they are empty after every snapshot even when the export
    /// that follows never reaches the wire.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut requests_by_method: Vec<(String, u64)> = self
            .requests_by_method
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        requests_by_method.sort();

        MetricsSnapshot {
            requests_by_method,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_users: self.active_users.load(Ordering::Relaxed),
            auth_successes: self.auth_successes.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            orders: self.orders.load(Ordering::Relaxed),
            pizzas_sold: self.pizzas_sold.load(Ordering::Relaxed),
            failed_orders: self.failed_orders.load(Ordering::Relaxed),
            revenue: self.revenue.lock().map(|guard| *guard).unwrap_or(0.0),
            request_latency: Self::drain(&self.request_latency),
            factory_latency: Self::drain(&self.factory_latency),
        }
    }

    fn drain(buffer: &Mutex<Vec<f64>>) -> Option<LatencySummary> {
        let samples = buffer
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();
        LatencySummary::from_samples(&samples)
    }
}
