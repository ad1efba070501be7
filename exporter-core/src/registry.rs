//! # registry
//!
//! [`PromSink`] owns one prometheus collector per catalog metric and is the
//! [`Sink`] every engine writes into. Collectors are created once at startup
//! from the catalogs, so the set of exported names and label schemas is
//! fixed for the life of the process.
use std::collections::HashMap;

use kea_stats::{Catalog, Family, Kind, Labels, MetricSchema, Sink};
use prometheus::{CounterVec, GaugeVec, Opts, Registry};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Collector {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

#[derive(Debug, Clone)]
struct Entry {
    labels: Vec<String>,
    collector: Collector,
}

impl Entry {
    fn new(schema: &MetricSchema) -> prometheus::Result<Self> {
        let opts = Opts::new(schema.name.clone(), schema.help.clone());
        let names = schema.labels.iter().map(String::as_str).collect::<Vec<_>>();
        let collector = match schema.kind {
            Kind::Counter => Collector::Counter(CounterVec::new(opts, &names)?),
            Kind::Gauge => Collector::Gauge(GaugeVec::new(opts, &names)?),
        };
        Ok(Self {
            labels: schema.labels.clone(),
            collector,
        })
    }

    fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        match &self.collector {
            Collector::Counter(vec) => registry.register(Box::new(vec.clone())),
            Collector::Gauge(vec) => registry.register(Box::new(vec.clone())),
        }
    }

    /// label values in schema order, undeclared ones dropped, missing ones empty
    fn values<'a>(&'a self, labels: &'a Labels) -> Vec<&'a str> {
        self.labels
            .iter()
            .map(|name| labels.get(name).map(String::as_str).unwrap_or(""))
            .collect()
    }
}

/// prometheus backed [`Sink`]
#[derive(Debug, Clone, Default)]
pub struct PromSink {
    metrics: HashMap<(Family, String), Entry>,
}

impl PromSink {
    /// Create and register a collector for every metric of every catalog.
    pub fn new<'a, I>(catalogs: I, registry: &Registry) -> prometheus::Result<Self>
    where
        I: IntoIterator<Item = &'a Catalog>,
    {
        let mut metrics = HashMap::new();
        for catalog in catalogs {
            for schema in catalog.metrics() {
                let entry = Entry::new(schema)?;
                entry.register(registry)?;
                trace!(family = %catalog.family(), name = %schema.name, "registered metric");
                metrics.insert((catalog.family(), schema.id.clone()), entry);
            }
        }
        debug!(count = metrics.len(), "kea metrics registered");
        Ok(Self { metrics })
    }

    /// number of collectors
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// true if no collectors are registered
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    fn entry(&self, family: Family, metric: &str) -> Option<&Entry> {
        let entry = self.metrics.get(&(family, metric.to_owned()));
        if entry.is_none() {
            debug!(%family, metric, "no collector for metric");
        }
        entry
    }
}

impl Sink for PromSink {
    fn set(&self, family: Family, metric: &str, labels: &Labels, value: f64) {
        match self.entry(family, metric).map(|e| (e, &e.collector)) {
            Some((entry, Collector::Gauge(vec))) => {
                vec.with_label_values(&entry.values(labels)).set(value)
            }
            Some((_, Collector::Counter(_))) => {
                debug!(%family, metric, "set on a counter, ignored")
            }
            None => {}
        }
    }

    fn inc(&self, family: Family, metric: &str, labels: &Labels, amount: f64) {
        match self.entry(family, metric).map(|e| (e, &e.collector)) {
            Some((entry, Collector::Counter(vec))) if amount > 0.0 => {
                vec.with_label_values(&entry.values(labels)).inc_by(amount)
            }
            // zero increments still create the series
            Some((entry, Collector::Counter(vec))) => {
                vec.with_label_values(&entry.values(labels));
            }
            Some((_, Collector::Gauge(_))) => debug!(%family, metric, "inc on a gauge, ignored"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{Encoder, TextEncoder};

    use super::*;

    fn sink() -> (PromSink, Registry) {
        let registry = Registry::new();
        let v4 = Catalog::builtin(Family::Dhcp4).unwrap();
        let v6 = Catalog::builtin(Family::Dhcp6).unwrap();
        let sink = PromSink::new([&v4, &v6], &registry).unwrap();
        (sink, registry)
    }

    fn text(registry: &Registry) -> String {
        let mut buf = String::new();
        TextEncoder::new()
            .encode_utf8(&registry.gather(), &mut buf)
            .unwrap();
        buf
    }

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_registers_every_catalog_metric() {
        let (sink, _registry) = sink();
        let expected = Catalog::builtin(Family::Dhcp4).unwrap().metrics().count()
            + Catalog::builtin(Family::Dhcp6).unwrap().metrics().count();
        assert_eq!(sink.len(), expected);

        // same names twice is a registration error
        let registry = Registry::new();
        let v4 = Catalog::builtin(Family::Dhcp4).unwrap();
        PromSink::new([&v4], &registry).unwrap();
        assert!(PromSink::new([&v4], &registry).is_err());
    }

    #[test]
    fn test_gauge_and_counter_exposition() {
        let (sink, registry) = sink();
        let pool = labels(&[
            ("subnet", "10.0.0.0/24"),
            ("subnet_id", "7"),
            ("pool", "10.0.0.51-10.0.0.100"),
        ]);
        sink.set(Family::Dhcp4, "addresses_total", &pool, 100.0);
        sink.inc(Family::Dhcp4, "sent_packets", &labels(&[("operation", "ack")]), 10.0);
        sink.inc(Family::Dhcp4, "sent_packets", &labels(&[("operation", "ack")]), 5.0);

        let out = text(&registry);
        assert!(
            out.contains(
                r#"kea_dhcp4_addresses_total{pool="10.0.0.51-10.0.0.100",subnet="10.0.0.0/24",subnet_id="7"} 100"#
            ),
            "{out}"
        );
        assert!(
            out.contains(r#"kea_dhcp4_packets_sent_total{operation="ack"} 15"#),
            "{out}"
        );
    }

    #[test]
    fn test_missing_labels_are_empty() {
        let (sink, registry) = sink();
        sink.set(
            Family::Dhcp4,
            "addresses_assigned_total",
            &labels(&[("subnet", "192.0.2.0/24"), ("subnet_id", "1")]),
            4.0,
        );
        assert!(text(&registry).contains(
            r#"kea_dhcp4_addresses_assigned_total{pool="",subnet="192.0.2.0/24",subnet_id="1"} 4"#
        ));
    }

    #[test]
    fn test_mismatched_kind_and_unknown_metric_ignored() {
        let (sink, registry) = sink();
        sink.set(Family::Dhcp4, "sent_packets", &labels(&[("operation", "ack")]), 3.0);
        sink.inc(Family::Dhcp6, "no_such_metric", &Labels::new(), 1.0);
        assert!(!text(&registry).contains("operation=\"ack\""));
    }
}
