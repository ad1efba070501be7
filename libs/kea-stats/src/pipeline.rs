//! # pipeline
//!
//! Turns one statistics snapshot into labeled observations. Each sample goes
//! through
//!
//! ```text
//! decode -> filter (ignore lists) -> resolve (subnet index) -> map (catalog) -> reconcile -> sink
//! ```
//!
//! and ends in exactly one [`Outcome`]. No sample can fail the cycle: stale
//! subnet references and unknown statistic names are reported once through
//! the shared [`WarnedSet`] and dropped.
//!
//! [`Pipeline`] covers everything up to reconciliation and holds no mutable
//! state of its own. [`Engine`] owns the per target, per family state (subnet
//! index and counter reconciler) and pushes reconciled updates to a [`Sink`].
use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, trace, warn};

use crate::{
    catalog::{Catalog, Kind, POOL_LABEL, SUBNET_ID_LABEL, SUBNET_LABEL},
    family::Family,
    key::DecodedKey,
    reconcile::{Reconciler, Update},
    sample::{RawSample, Statistics},
    subnets::{SubnetConfig, SubnetIndex},
    warned::{Diagnostic, WarnedSet},
};

/// label name to value, sorted by name
pub type Labels = BTreeMap<String, String>;

/// one labeled value ready for the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// output metric id from the catalog
    pub metric: String,
    /// counter or gauge
    pub kind: Kind,
    /// exactly the labels declared by the metric's schema
    pub labels: Labels,
    /// absolute value from the snapshot
    pub value: f64,
}

/// how a single sample left the pipeline
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// produced an observation
    Emitted,
    /// matched an ignore list
    Filtered,
    /// referenced a subnet or pool missing from the configuration
    Stale,
    /// name not in the catalog
    Unmapped,
}

/// per cycle summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// samples that produced an observation
    pub emitted: usize,
    /// samples dropped by an ignore list
    pub filtered: usize,
    /// samples dropped for a missing subnet/pool
    pub stale: usize,
    /// samples dropped for a missing catalog entry
    pub unmapped: usize,
    /// diagnostics reported for the first time during this cycle
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Emitted => self.emitted += 1,
            Outcome::Filtered => self.filtered += 1,
            Outcome::Stale => self.stale += 1,
            Outcome::Unmapped => self.unmapped += 1,
        }
    }

    /// count for one outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Emitted => self.emitted,
            Outcome::Filtered => self.filtered,
            Outcome::Stale => self.stale,
            Outcome::Unmapped => self.unmapped,
        }
    }
}

/// observations of one snapshot plus what happened to every sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// observations in sample key order
    pub observations: Vec<Observation>,
    /// outcome counts and new diagnostics
    pub report: Report,
}

/// receiver of reconciled values, i.e. the metrics registry
pub trait Sink {
    /// overwrite a gauge
    fn set(&self, family: Family, metric: &str, labels: &Labels, value: f64);
    /// add a non-negative amount to a counter
    fn inc(&self, family: Family, metric: &str, labels: &Labels, amount: f64);
}

/// stateless decode/filter/resolve/map stages for one family
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    catalog: &'a Catalog,
    warned: &'a WarnedSet,
}

impl<'a> Pipeline<'a> {
    /// pipeline over a family catalog, reporting into `warned`
    pub fn new(catalog: &'a Catalog, warned: &'a WarnedSet) -> Self {
        Self { catalog, warned }
    }

    /// run every sample of a snapshot through the pipeline
    pub fn normalize(&self, stats: &Statistics, index: &SubnetIndex) -> Normalized {
        let mut out = Normalized::default();
        for sample in stats.iter() {
            let (outcome, obs) = self.classify(sample, index, &mut out.report.diagnostics);
            out.report.record(outcome);
            out.observations.extend(obs);
        }
        out
    }

    /// run a single sample through the pipeline
    pub fn classify(
        &self,
        sample: &RawSample,
        index: &SubnetIndex,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (Outcome, Option<Observation>) {
        let family = self.catalog.family();
        let key = DecodedKey::decode(&sample.key);

        // filter
        let ignored = if key.is_global() {
            self.catalog.is_globally_ignored(key.metric())
        } else {
            self.catalog.is_subnet_ignored(key.metric())
        };
        if ignored {
            trace!(key = %sample.key, "ignored");
            return (Outcome::Filtered, None);
        }

        // resolve
        let mut labels = Labels::new();
        match key {
            DecodedKey::Global(_) => {}
            DecodedKey::Subnet { subnet_id, .. } => {
                let Some(subnet) = index.resolve_subnet(subnet_id) else {
                    self.report(Diagnostic::VanishedSubnet { family, subnet_id }, diagnostics);
                    return (Outcome::Stale, None);
                };
                labels.insert(SUBNET_LABEL.to_owned(), subnet.label.clone());
                labels.insert(SUBNET_ID_LABEL.to_owned(), subnet_id.to_string());
            }
            DecodedKey::SubnetPool {
                subnet_id,
                pool_index,
                ..
            } => {
                let Some(subnet) = index.resolve_subnet(subnet_id) else {
                    self.report(Diagnostic::VanishedSubnet { family, subnet_id }, diagnostics);
                    return (Outcome::Stale, None);
                };
                let Some(pool) = index.resolve_pool(subnet_id, pool_index) else {
                    self.report(
                        Diagnostic::VanishedPool {
                            family,
                            subnet_id,
                            pool_index,
                        },
                        diagnostics,
                    );
                    return (Outcome::Stale, None);
                };
                labels.insert(SUBNET_LABEL.to_owned(), subnet.label.clone());
                labels.insert(SUBNET_ID_LABEL.to_owned(), subnet_id.to_string());
                labels.insert(POOL_LABEL.to_owned(), pool.to_owned());
            }
        }

        // map
        let Some(mapped) = self.catalog.map_metric(key.metric()) else {
            self.report(
                Diagnostic::Unmapped {
                    metric: key.metric().to_owned(),
                },
                diagnostics,
            );
            return (Outcome::Unmapped, None);
        };

        labels.extend(
            mapped
                .fixed_labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        // keep only the schema's labels, a declared label with no source is empty
        let schema = mapped.schema;
        let labels: Labels = schema
            .labels
            .iter()
            .map(|name| {
                let value = labels.remove(name).unwrap_or_default();
                (name.clone(), value)
            })
            .collect();

        (
            Outcome::Emitted,
            Some(Observation {
                metric: schema.id.clone(),
                kind: schema.kind,
                labels,
                value: sample.value,
            }),
        )
    }

    fn report(&self, diag: Diagnostic, diagnostics: &mut Vec<Diagnostic>) {
        if !self.warned.first(&diag) {
            return;
        }
        match &diag {
            Diagnostic::Unmapped { metric } => {
                warn!(family = %self.catalog.family(), %metric, "unhandled metric, ignoring it from now on")
            }
            Diagnostic::VanishedSubnet { family, subnet_id } => {
                warn!(%family, subnet_id, "ignoring metric because subnet vanished from configuration")
            }
            Diagnostic::VanishedPool {
                family,
                subnet_id,
                pool_index,
            } => {
                warn!(%family, subnet_id, pool_index, "ignoring metric because pool vanished from configuration")
            }
        }
        diagnostics.push(diag);
    }
}

/// per target, per family normalization state
#[derive(Debug)]
pub struct Engine {
    catalog: Arc<Catalog>,
    warned: Arc<WarnedSet>,
    index: Option<SubnetIndex>,
    reconciler: Reconciler,
}

impl Engine {
    /// fresh state; nothing is processed until the first [`Engine::refresh`]
    pub fn new(catalog: Arc<Catalog>, warned: Arc<WarnedSet>) -> Self {
        Self {
            catalog,
            warned,
            index: None,
            reconciler: Reconciler::new(),
        }
    }

    /// family of the catalog
    pub fn family(&self) -> Family {
        self.catalog.family()
    }

    /// replace the subnet index with a freshly fetched configuration
    pub fn refresh<I>(&mut self, subnets: I)
    where
        I: IntoIterator<Item = SubnetConfig>,
    {
        let index = SubnetIndex::new(subnets);
        debug!(family = %self.family(), subnets = index.len(), "subnet index refreshed");
        self.index = Some(index);
    }

    /// current subnet index, if any configuration was loaded
    pub fn index(&self) -> Option<&SubnetIndex> {
        self.index.as_ref()
    }

    /// counter state
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// normalize a snapshot and apply it to `sink`. Returns `None` without
    /// touching any state if no configuration has been loaded yet.
    pub fn process<S>(&mut self, stats: &Statistics, sink: &S) -> Option<Report>
    where
        S: Sink + ?Sized,
    {
        let Some(index) = self.index.as_ref() else {
            debug!(family = %self.family(), "no configuration loaded, skipping snapshot");
            return None;
        };
        let family = self.catalog.family();
        let Normalized {
            observations,
            report,
        } = Pipeline::new(&self.catalog, &self.warned).normalize(stats, index);

        for obs in &observations {
            match self.reconciler.reconcile(obs) {
                Update::Set(value) => sink.set(family, &obs.metric, &obs.labels, value),
                Update::Inc(amount) => sink.inc(family, &obs.metric, &obs.labels, amount),
            }
        }
        Some(report)
    }
}
