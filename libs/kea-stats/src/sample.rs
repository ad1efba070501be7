//! raw statistics as returned by `statistic-get-all`
//!
//! Kea returns every statistic with its recent history, newest first:
//!
//! ```json
//! { "pkt4-received": [ [ 42, "2024-01-01 10:00:01.000" ], [ 40, "2024-01-01 10:00:00.000" ] ] }
//! ```
//!
//! Only the first entry is authoritative.
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

/// most recent value of one statistic
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// raw key, e.g. `subnet[1].pool[0].assigned-addresses`
    pub key: String,
    /// numeric value
    pub value: f64,
    /// server timestamp of the sample, not interpreted
    pub timestamp: Option<String>,
}

impl RawSample {
    /// new sample without a timestamp
    pub fn new<S: Into<String>>(key: S, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp: None,
        }
    }
}

/// one statistics snapshot for a single family, ordered by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    samples: Vec<RawSample>,
}

impl Statistics {
    /// build from already reduced samples
    pub fn new(mut samples: Vec<RawSample>) -> Self {
        samples.sort_by(|a, b| a.key.cmp(&b.key));
        Self { samples }
    }

    /// parse the `arguments` object of a `statistic-get-all` response.
    /// Entries without history or with a non-numeric newest value are skipped.
    pub fn from_arguments(arguments: &Value) -> Self {
        let Some(map) = arguments.as_object() else {
            return Self::default();
        };
        let samples = map
            .iter()
            .filter_map(|(key, history)| newest(key, history))
            .collect();
        Self::new(samples)
    }

    /// samples in key order
    pub fn iter(&self) -> impl Iterator<Item = &RawSample> {
        self.samples.iter()
    }

    /// number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// true if the snapshot had no usable samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<'de> Deserialize<'de> for Statistics {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self::new(
            map.iter()
                .filter_map(|(key, history)| newest(key, history))
                .collect(),
        ))
    }
}

impl FromIterator<(String, f64)> for Statistics {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| RawSample::new(k, v)).collect())
    }
}

fn newest(key: &str, history: &Value) -> Option<RawSample> {
    let entry = history.as_array()?.first()?.as_array()?;
    let Some(value) = entry.first().and_then(Value::as_f64) else {
        trace!(key, ?entry, "skipping non-numeric statistic");
        return None;
    };
    Some(RawSample {
        key: key.to_owned(),
        value,
        timestamp: entry.get(1).and_then(Value::as_str).map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn only_newest_entry_is_used() {
        let stats = Statistics::from_arguments(&json!({
            "pkt4-received": [[42, "2024-01-01 10:00:01.000"], [40, "2024-01-01 10:00:00.000"]],
            "subnet[1].total-addresses": [[256.0, "2024-01-01 10:00:00.000"]],
        }));
        let samples = stats.iter().collect::<Vec<_>>();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].key, "pkt4-received");
        assert_eq!(samples[0].value, 42.0);
        assert_eq!(
            samples[0].timestamp.as_deref(),
            Some("2024-01-01 10:00:01.000")
        );
        assert_eq!(samples[1].value, 256.0);
    }

    #[test]
    fn unusable_entries_are_skipped() {
        let stats: Statistics = serde_json::from_value(json!({
            "empty": [],
            "text": [["abc", "2024-01-01 10:00:00.000"]],
            "not-a-list": 5,
            "ok": [[1, "2024-01-01 10:00:00.000"]],
        }))
        .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.iter().next().unwrap().key, "ok");
    }

    #[test]
    fn non_object_arguments() {
        assert!(Statistics::from_arguments(&json!([1, 2])).is_empty());
    }
}
