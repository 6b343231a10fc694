//! Concurrent scraping of all configured ZooKeeper instances.
//!
//! One collection cycle spawns a task per instance and waits for all of
//! them. Each task emits its metric samples followed by exactly one
//! `zk_up` sample into the shared [`SampleSink`]. A failed exchange emits
//! only `zk_up 0`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, trace, warn};

use crate::catalog::{Catalog, MetricSpec};
use crate::client;
use crate::config::InstanceConfig;
use crate::parser;

/// Name of the synthetic up-indicator metric.
pub const UP_METRIC: &str = "zk_up";

/// What a sample measures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleMetric {
    /// The up-indicator.
    Up,
    /// A catalog metric.
    Spec(&'static MetricSpec),
}

impl SampleMetric {
    pub fn name(&self) -> &'static str {
        match self {
            SampleMetric::Up => UP_METRIC,
            SampleMetric::Spec(spec) => spec.name,
        }
    }
}

/// One emitted value for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Instance name, exported as the `host` label.
    pub instance: String,
    pub metric: SampleMetric,
    pub value: f64,
}

/// Result of scraping a single instance once.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub instance: String,
    pub up: bool,
    /// Observed metrics in response order. Always empty when `up` is false.
    pub metrics: Vec<(&'static MetricSpec, f64)>,
    /// Malformed lines skipped while parsing.
    pub malformed_lines: usize,
}

impl ScrapeResult {
    fn down(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            up: false,
            metrics: Vec::new(),
            malformed_lines: 0,
        }
    }

    /// Convert into samples; the up-indicator is always last.
    pub fn into_samples(self) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.metrics.len() + 1);
        for (spec, value) in self.metrics {
            samples.push(Sample {
                instance: self.instance.clone(),
                metric: SampleMetric::Spec(spec),
                value,
            });
        }
        samples.push(Sample {
            instance: self.instance,
            metric: SampleMetric::Up,
            value: if self.up { 1.0 } else { 0.0 },
        });
        samples
    }
}

/// Destination for emitted samples. Shared by all tasks of a cycle.
pub trait SampleSink: Send + Sync {
    fn emit(&self, sample: Sample);
}

/// Sink that buffers samples in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    samples: Mutex<Vec<Sample>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered samples, leaving the sink empty.
    pub fn take(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

impl SampleSink for VecSink {
    fn emit(&self, sample: Sample) {
        self.samples.lock().push(sample);
    }
}

impl SampleSink for mpsc::UnboundedSender<Sample> {
    fn emit(&self, sample: Sample) {
        if self.send(sample).is_err() {
            trace!("Sample receiver dropped, discarding sample");
        }
    }
}

/// Scrapes every configured instance.
#[derive(Debug, Clone)]
pub struct Scraper {
    instances: Arc<[InstanceConfig]>,
    catalog: Arc<Catalog>,
    timeout: Duration,
}

impl Scraper {
    /// Create a scraper over a fixed instance list.
    pub fn new(instances: Vec<InstanceConfig>, catalog: Arc<Catalog>, timeout: Duration) -> Self {
        Self {
            instances: instances.into(),
            catalog,
            timeout,
        }
    }

    pub fn instances(&self) -> &[InstanceConfig] {
        &self.instances
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Run one collection cycle, emitting into `sink`.
    ///
    /// Returns once every instance has been scraped or has failed.
    pub async fn collect(&self, sink: Arc<dyn SampleSink>) {
        let mut tasks = JoinSet::new();

        for instance in self.instances.iter().cloned() {
            let catalog = self.catalog.clone();
            let sink = sink.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let result = scrape_one(&instance, &catalog, timeout).await;
                for sample in result.into_samples() {
                    sink.emit(sample);
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Scrape task failed");
            }
        }
    }

    /// Run one collection cycle and return the samples.
    pub async fn collect_samples(&self) -> Vec<Sample> {
        let sink = Arc::new(VecSink::new());
        self.collect(sink.clone()).await;
        sink.take()
    }

    /// Scrape a single instance.
    pub async fn scrape_instance(&self, instance: &InstanceConfig) -> ScrapeResult {
        scrape_one(instance, &self.catalog, self.timeout).await
    }
}

async fn scrape_one(instance: &InstanceConfig, catalog: &Catalog, timeout: Duration) -> ScrapeResult {
    debug!(instance = %instance.name, address = %instance.address, "Fetching metrics from ZooKeeper");

    let raw = match client::send_command(&instance.address, instance.command(), timeout).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                instance = %instance.name,
                address = %instance.address,
                kind = e.kind(),
                error = %e,
                "Failed to fetch metrics"
            );
            return ScrapeResult::down(&instance.name);
        }
    };

    let parsed = parser::parse(&raw, catalog);
    if parsed.malformed_lines > 0 {
        warn!(
            instance = %instance.name,
            malformed_lines = parsed.malformed_lines,
            "Response contained malformed lines"
        );
    }

    let metrics: Vec<_> = parsed
        .entries
        .iter()
        .map(|(spec, value)| (*spec, spec.extract(value)))
        .collect();

    debug!(
        instance = %instance.name,
        metrics = metrics.len(),
        unknown_keys = parsed.unknown_keys,
        "Scrape succeeded"
    );

    ScrapeResult {
        instance: instance.name.clone(),
        up: true,
        metrics,
        malformed_lines: parsed.malformed_lines,
    }
}
