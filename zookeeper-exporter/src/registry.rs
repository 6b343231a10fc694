//! Descriptor registry and Prometheus text exposition.
//!
//! The registry owns the fixed descriptor set (the up-indicator followed by
//! every catalog metric) and renders the samples of one collection cycle in
//! text format 0.0.4.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::catalog::{Catalog, ValueKind};
use crate::scrape::{Sample, UP_METRIC};

/// Label carrying the instance name.
pub const INSTANCE_LABEL: &str = "host";

/// Name of the exporter build info metric.
pub const BUILD_INFO_METRIC: &str = "zk_exporter_build_info";

/// Static description of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: ValueKind,
}

/// Registry of all descriptors plus the static label set.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    descriptors: Vec<Descriptor>,
    const_labels: Vec<(String, String)>,
}

impl MetricsRegistry {
    /// Publish the descriptor set for `catalog` with the given static labels.
    ///
    /// Static labels that would collide with the instance label are dropped.
    pub fn new(catalog: &Catalog, labels: &BTreeMap<String, String>) -> Self {
        let mut descriptors = Vec::with_capacity(catalog.len() + 1);
        descriptors.push(Descriptor {
            name: UP_METRIC,
            help: "Exporter successful",
            kind: ValueKind::Gauge,
        });
        descriptors.extend(catalog.all_specs().iter().map(|spec| Descriptor {
            name: spec.name,
            help: spec.help,
            kind: spec.kind,
        }));

        let mut const_labels: Vec<(String, String)> = Vec::with_capacity(labels.len());
        for (k, v) in labels {
            let key = sanitize_label_name(k);
            if key != INSTANCE_LABEL && !const_labels.iter().any(|(lk, _)| lk == &key) {
                const_labels.push((key, v.clone()));
            }
        }

        Self {
            descriptors,
            const_labels,
        }
    }

    /// All descriptors, up-indicator first.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Render one cycle's samples.
    ///
    /// Metrics without samples are omitted. Series within a metric follow
    /// the order of their first sample. Repeated samples for the same
    /// instance collapse into one series carrying the last value.
    pub fn render(&self, samples: &[Sample]) -> String {
        let mut by_name: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
        for sample in samples {
            let series = by_name.entry(sample.metric.name()).or_default();
            match series
                .iter_mut()
                .find(|(instance, _)| *instance == sample.instance)
            {
                Some(existing) => existing.1 = sample.value,
                None => series.push((sample.instance.as_str(), sample.value)),
            }
        }

        let mut output = String::with_capacity(samples.len() * 64 + 256);

        for desc in &self.descriptors {
            let Some(series) = by_name.get(desc.name) else {
                continue;
            };

            writeln!(output, "# HELP {} {}", desc.name, escape_help(desc.help)).ok();
            writeln!(output, "# TYPE {} {}", desc.name, desc.kind.as_str()).ok();

            for (instance, value) in series {
                writeln!(
                    output,
                    "{}{} {}",
                    desc.name,
                    self.format_labels(instance),
                    format_value(*value)
                )
                .ok();
            }
        }

        writeln!(
            output,
            "# HELP {} Build information of the ZooKeeper exporter",
            BUILD_INFO_METRIC
        )
        .ok();
        writeln!(output, "# TYPE {} gauge", BUILD_INFO_METRIC).ok();
        writeln!(
            output,
            "{}{{version=\"{}\"}} 1",
            BUILD_INFO_METRIC,
            escape_label_value(env!("CARGO_PKG_VERSION"))
        )
        .ok();

        output
    }

    /// Instance label plus static labels, sorted by name.
    fn format_labels(&self, instance: &str) -> String {
        let mut labels: Vec<(&str, &str)> = Vec::with_capacity(1 + self.const_labels.len());
        labels.push((INSTANCE_LABEL, instance));
        labels.extend(self.const_labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        labels.sort_by(|a, b| a.0.cmp(b.0));

        let parts: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        format!("{{{}}}", parts.join(","))
    }
}

/// Sanitize a label name to be Prometheus-compatible.
///
/// Prometheus label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Labels starting with `__` are reserved for internal use.
pub fn sanitize_label_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for (i, c) in name.chars().enumerate() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            result.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "label".to_string();
    }

    if result.starts_with("__") {
        result.insert(0, 'z');
    }

    result
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape HELP text (backslash and newline only).
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::SampleMetric;

    fn sample(catalog: &Catalog, instance: &str, metric: &str, value: f64) -> Sample {
        let metric = if metric == UP_METRIC {
            SampleMetric::Up
        } else {
            SampleMetric::Spec(catalog.lookup(metric).unwrap())
        };
        Sample {
            instance: instance.to_string(),
            metric,
            value,
        }
    }

    #[test]
    fn test_descriptors_up_first_then_catalog() {
        let catalog = Catalog::default();
        let registry = MetricsRegistry::new(&catalog, &BTreeMap::new());

        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names.len(), catalog.len() + 1);
        assert_eq!(names[0], "zk_up");
        assert_eq!(names[1], "zk_avg_latency");
    }

    #[test]
    fn test_render_types_and_values() {
        let catalog = Catalog::default();
        let registry = MetricsRegistry::new(&catalog, &BTreeMap::new());
        let samples = vec![
            sample(&catalog, "zk1", "zk_packets_sent", 1234.0),
            sample(&catalog, "zk1", "zk_server_state", 1.0),
            sample(&catalog, "zk1", "zk_avg_latency", 0.5),
            sample(&catalog, "zk1", UP_METRIC, 1.0),
        ];

        let output = registry.render(&samples);

        assert!(output.contains("# TYPE zk_up gauge\nzk_up{host=\"zk1\"} 1\n"));
        assert!(output.contains("# TYPE zk_packets_sent counter\n"));
        assert!(output.contains("zk_packets_sent{host=\"zk1\"} 1234\n"));
        assert!(output.contains("# TYPE zk_server_state untyped\n"));
        assert!(output.contains("zk_avg_latency{host=\"zk1\"} 0.5\n"));
        assert!(output.contains("# HELP zk_avg_latency Average latency of requests\n"));
        // Metrics without samples are omitted
        assert!(!output.contains("zk_znode_count"));
    }

    #[test]
    fn test_render_follows_descriptor_order() {
        let catalog = Catalog::default();
        let registry = MetricsRegistry::new(&catalog, &BTreeMap::new());
        let samples = vec![
            sample(&catalog, "zk1", "zk_followers", 2.0),
            sample(&catalog, "zk1", UP_METRIC, 1.0),
            sample(&catalog, "zk2", UP_METRIC, 0.0),
        ];

        let output = registry.render(&samples);

        let up = output.find("# TYPE zk_up").unwrap();
        let followers = output.find("# TYPE zk_followers").unwrap();
        assert!(up < followers);
        assert!(output.contains("zk_up{host=\"zk1\"} 1\nzk_up{host=\"zk2\"} 0\n"));
    }

    #[test]
    fn test_render_collapses_repeated_series() {
        let catalog = Catalog::default();
        let registry = MetricsRegistry::new(&catalog, &BTreeMap::new());
        let samples = vec![
            sample(&catalog, "zk", "zk_followers", 2.0),
            sample(&catalog, "other", "zk_followers", 1.0),
            sample(&catalog, "zk", "zk_followers", 3.0),
            sample(&catalog, "zk", UP_METRIC, 1.0),
            sample(&catalog, "zk", UP_METRIC, 0.0),
        ];

        let output = registry.render(&samples);

        assert!(
            output.contains("zk_followers{host=\"zk\"} 3\nzk_followers{host=\"other\"} 1\n"),
            "Output: {}",
            output
        );
        assert_eq!(output.matches("zk_followers{host=\"zk\"}").count(), 1);
        assert_eq!(output.matches("zk_up{host=\"zk\"}").count(), 1);
        assert!(output.contains("zk_up{host=\"zk\"} 0\n"));
    }

    #[test]
    fn test_render_with_static_labels() {
        let catalog = Catalog::default();
        let mut labels = BTreeMap::new();
        labels.insert("env".to_string(), "prod".to_string());
        labels.insert("cluster-name".to_string(), "main".to_string());
        labels.insert("host".to_string(), "ignored".to_string());
        let registry = MetricsRegistry::new(&catalog, &labels);

        let output = registry.render(&[sample(&catalog, "zk1", UP_METRIC, 1.0)]);

        assert!(
            output.contains("zk_up{cluster_name=\"main\",env=\"prod\",host=\"zk1\"} 1\n"),
            "Output: {}",
            output
        );
        assert!(!output.contains("ignored"));
    }

    #[test]
    fn test_render_empty_cycle_has_only_build_info() {
        let registry = MetricsRegistry::new(&Catalog::default(), &BTreeMap::new());

        let output = registry.render(&[]);

        assert!(
            output
                .lines()
                .all(|l| l.starts_with('#') || l.starts_with(BUILD_INFO_METRIC)),
            "Output: {}",
            output
        );
        assert!(output.contains(&format!(
            "{}{{version=\"{}\"}} 1",
            BUILD_INFO_METRIC,
            env!("CARGO_PKG_VERSION")
        )));
    }

    #[test]
    fn test_instance_name_is_escaped() {
        let catalog = Catalog::default();
        let registry = MetricsRegistry::new(&catalog, &BTreeMap::new());

        let output = registry.render(&[sample(&catalog, "zk\"1", UP_METRIC, 1.0)]);

        assert!(output.contains("zk_up{host=\"zk\\\"1\"} 1"));
    }

    #[test]
    fn test_sanitize_label_name() {
        assert_eq!(sanitize_label_name("env"), "env");
        assert_eq!(sanitize_label_name("data-center"), "data_center");
        assert_eq!(sanitize_label_name("rack.id"), "rack_id");
        assert_eq!(sanitize_label_name("1zone"), "_zone");
        assert_eq!(sanitize_label_name("__meta"), "z__meta");
        assert_eq!(sanitize_label_name("..."), "label");
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(2.25), "2.25");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
