//! # reconcile
//!
//! Kea reports counters as absolute values that restart from zero when the
//! daemon restarts or `statistic-reset` is issued. The exported counter must
//! never go backwards, so for each series we remember the last absolute value
//! and export only the growth since then:
//!
//! - `v >= last`: increment by `v - last`
//! - `v < last`: the upstream counter was reset between polls, increment by `v`
//!
//! A reset followed by growth back past `last` before the next poll looks
//! exactly like no reset and under-counts by the pre-reset amount. Kea exposes
//! nothing that would let us tell the two apart.
use std::collections::HashMap;

use crate::{
    catalog::Kind,
    pipeline::{Labels, Observation},
};

/// what to apply to the registry for one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    /// gauge: overwrite with this value
    Set(f64),
    /// counter: add this non-negative amount
    Inc(f64),
}

/// last absolute value seen per (metric, labels) for counters of one target
/// and family. Entries are never evicted; the key space is bounded by the
/// series the target actually reports.
#[derive(Debug, Default)]
pub struct Reconciler {
    last: HashMap<(String, Labels), f64>,
}

impl Reconciler {
    /// empty state: every series starts from a baseline of 0
    pub fn new() -> Self {
        Self::default()
    }

    /// turn an observation into a registry update, committing counter state
    pub fn reconcile(&mut self, obs: &Observation) -> Update {
        match obs.kind {
            Kind::Gauge => Update::Set(obs.value),
            Kind::Counter => Update::Inc(self.advance(&obs.metric, &obs.labels, obs.value)),
        }
    }

    /// record `value` for a counter series and return the amount to add
    pub fn advance(&mut self, metric: &str, labels: &Labels, value: f64) -> f64 {
        let key = (metric.to_owned(), labels.clone());
        let last = self.last.entry(key).or_insert(0.0);
        let baseline = if value < *last { 0.0 } else { *last };
        *last = value;
        (value - baseline).max(0.0)
    }

    /// last absolute value recorded for a series
    pub fn last(&self, metric: &str, labels: &Labels) -> Option<f64> {
        self.last.get(&(metric.to_owned(), labels.clone())).copied()
    }

    /// number of tracked counter series
    pub fn len(&self) -> usize {
        self.last.len()
    }

    /// true if no counter was seen yet
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
