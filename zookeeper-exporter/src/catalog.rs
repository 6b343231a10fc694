//! Static catalog of the `mntr` keys exported as metrics.
//!
//! Each entry binds a key to its Prometheus type and to the rule that turns
//! the raw text value into a number. Keys absent from the catalog are never
//! exported.

use std::collections::HashMap;

use tracing::warn;

/// Prometheus metric type of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
    Untyped,
}

impl ValueKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Counter => "counter",
            ValueKind::Untyped => "untyped",
        }
    }
}

/// How a raw `mntr` value becomes a sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// Parse as a float; unparseable text yields 0.0.
    Numeric,
    /// 1.0 when the value is exactly `leader`, otherwise 0.0.
    LeaderFlag,
}

impl Extractor {
    /// Convert a raw value. Never fails.
    pub fn extract(&self, raw: &str) -> f64 {
        match self {
            Extractor::Numeric => parse_float_or_zero(raw),
            Extractor::LeaderFlag => {
                if raw == "leader" {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

fn parse_float_or_zero(raw: &str) -> f64 {
    match raw.parse::<f64>() {
        Ok(v) => v,
        Err(e) => {
            warn!(value = %raw, error = %e, "Failed to parse value as float, using 0");
            0.0
        }
    }
}

/// A known metric.
#[derive(Debug, PartialEq)]
pub struct MetricSpec {
    /// `mntr` key, also used as the exported metric name.
    pub name: &'static str,
    /// HELP text.
    pub help: &'static str,
    pub kind: ValueKind,
    pub extractor: Extractor,
}

impl MetricSpec {
    const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: ValueKind::Gauge,
            extractor: Extractor::Numeric,
        }
    }

    const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: ValueKind::Counter,
            extractor: Extractor::Numeric,
        }
    }

    /// Convert a raw value with this metric's extraction rule.
    pub fn extract(&self, raw: &str) -> f64 {
        self.extractor.extract(raw)
    }
}

/// Every exported `mntr` key, in exposition order.
pub static METRIC_SPECS: &[MetricSpec] = &[
    MetricSpec::gauge("zk_avg_latency", "Average latency of requests"),
    MetricSpec::gauge("zk_max_latency", "Maximum seen latency of requests"),
    MetricSpec::gauge("zk_min_latency", "Minimum seen latency of requests"),
    MetricSpec::counter("zk_packets_received", "Number of packets received"),
    MetricSpec::counter("zk_packets_sent", "Number of packets sent"),
    MetricSpec::gauge("zk_num_alive_connections", "Number of active connections"),
    MetricSpec::gauge("zk_outstanding_requests", "Number of outstanding requests"),
    MetricSpec {
        name: "zk_server_state",
        help: "Server state (leader/follower)",
        kind: ValueKind::Untyped,
        extractor: Extractor::LeaderFlag,
    },
    MetricSpec::gauge("zk_znode_count", "Number of znodes"),
    MetricSpec::gauge("zk_watch_count", "Number of watches"),
    MetricSpec::gauge("zk_ephemerals_count", "Number of ephemeral nodes"),
    MetricSpec::gauge("zk_approximate_data_size", "Approximate size of data set"),
    MetricSpec::gauge(
        "zk_open_file_descriptor_count",
        "Number of open file descriptors",
    ),
    MetricSpec::counter(
        "zk_max_file_descriptor_count",
        "Maximum number of open file descriptors",
    ),
    MetricSpec::gauge("zk_followers", "Number of followers"),
    MetricSpec::gauge("zk_synced_followers", "Number of followers in sync"),
    MetricSpec::gauge(
        "zk_pending_syncs",
        "Number of followers with synchronizations pending",
    ),
    MetricSpec::gauge(
        "zk_fsync_threshold_exceed_count",
        "Number of times fsync exceeded the warning threshold",
    ),
    MetricSpec::gauge("zk_max_proposal_size", "Largest proposal size seen in bytes"),
    MetricSpec::gauge("zk_min_proposal_size", "Smallest proposal size seen in bytes"),
    MetricSpec::gauge("zk_last_proposal_size", "Size of the last proposal in bytes"),
];

/// Name-indexed view over [`METRIC_SPECS`].
#[derive(Debug)]
pub struct Catalog {
    specs: &'static [MetricSpec],
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Build a catalog over an arbitrary static table.
    pub fn new(specs: &'static [MetricSpec]) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name, i))
            .collect();
        Self { specs, index }
    }

    /// Look up a metric by its `mntr` key.
    pub fn lookup(&self, name: &str) -> Option<&'static MetricSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// All metrics in declaration order.
    pub fn all_specs(&self) -> &'static [MetricSpec] {
        self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(METRIC_SPECS)
    }
}
