//! OTLP-shaped JSON wire model
//!
//! Just enough of the OpenTelemetry metrics JSON mapping for the Grafana
//! push endpoint: one resource, one scope, a flat list of sums and gauges.
//! Attribute values always go on the wire as strings, even when numeric in
//! memory.

use serde::Serialize;

pub const AGGREGATION_TEMPORALITY_CUMULATIVE: &str = "AGGREGATION_TEMPORALITY_CUMULATIVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetricsRequest {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl ExportMetricsRequest {
    /// Wrap a flat metric list in the single-resource, single-scope envelope
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics { metrics }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Serialize)]
pub struct ScopeMetrics {
    pub metrics: Vec<Metric>,
}

/// One exported series: a cumulative monotonic sum or a last-value gauge
#[derive(Debug, Serialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<Sum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<Gauge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    pub data_points: Vec<DataPoint>,
    pub aggregation_temporality: &'static str,
    pub is_monotonic: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_int: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_double: Option<f64>,
    pub time_unix_nano: u64,
    pub attributes: Vec<KeyValue>,
}

impl DataPoint {
    fn int(value: i64, time_unix_nano: u64, attributes: Vec<KeyValue>) -> Self {
        Self {
            as_int: Some(value),
            as_double: None,
            time_unix_nano,
            attributes,
        }
    }

    fn double(value: f64, time_unix_nano: u64, attributes: Vec<KeyValue>) -> Self {
        Self {
            as_int: None,
            as_double: Some(value),
            time_unix_nano,
            attributes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

impl KeyValue {
    pub fn string(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: AnyValue {
                string_value: value.into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

impl Metric {
    pub fn sum_int(
        name: &str,
        unit: &str,
        value: i64,
        time_unix_nano: u64,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            sum: Some(Sum {
                data_points: vec![DataPoint::int(value, time_unix_nano, attributes)],
                aggregation_temporality: AGGREGATION_TEMPORALITY_CUMULATIVE,
                is_monotonic: true,
            }),
            gauge: None,
        }
    }

    pub fn sum_double(
        name: &str,
        unit: &str,
        value: f64,
        time_unix_nano: u64,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            sum: Some(Sum {
                data_points: vec![DataPoint::double(value, time_unix_nano, attributes)],
                aggregation_temporality: AGGREGATION_TEMPORALITY_CUMULATIVE,
                is_monotonic: true,
            }),
            gauge: None,
        }
    }

    pub fn gauge_int(
        name: &str,
        unit: &str,
        value: i64,
        time_unix_nano: u64,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            sum: None,
            gauge: Some(Gauge {
                data_points: vec![DataPoint::int(value, time_unix_nano, attributes)],
            }),
        }
    }

    pub fn gauge_double(
        name: &str,
        unit: &str,
        value: f64,
        time_unix_nano: u64,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            sum: None,
            gauge: Some(Gauge {
                data_points: vec![DataPoint::double(value, time_unix_nano, attributes)],
            }),
        }
    }
}
