//! # catalog
//!
//! Per-family tables that say which kea statistics are exported, under which
//! output metric and with which fixed labels, plus the two ignore lists.
//!
//! The tables are data (`tables/*.yaml`), compiled into the binary and
//! optionally replaced from disk at startup. Once loaded a [`Catalog`] is
//! immutable and shared between all targets.
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::family::Family;

/// label carrying the subnet prefix
pub const SUBNET_LABEL: &str = "subnet";
/// label carrying the numeric subnet id
pub const SUBNET_ID_LABEL: &str = "subnet_id";
/// label carrying the pool range
pub const POOL_LABEL: &str = "pool";

static DHCP4_TABLE: &str = include_str!("../tables/dhcp4.yaml");
static DHCP6_TABLE: &str = include_str!("../tables/dhcp6.yaml");

/// numeric kind of an output metric
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// cumulative, goes through the counter reconciler
    Counter,
    /// instantaneous, overwritten every cycle
    Gauge,
}

/// an output metric and its label schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSchema {
    /// id used by mappings, e.g. `addresses_total`
    pub id: String,
    /// exported name, e.g. `kea_dhcp4_addresses_total`
    pub name: String,
    /// help text
    pub help: String,
    /// counter or gauge
    pub kind: Kind,
    /// declared label names, in exposition order
    pub labels: Vec<String>,
}

impl MetricSchema {
    /// true if `label` is part of this metric's schema
    pub fn declares(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// result of looking up a bare metric name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedMetric<'a> {
    /// target output metric
    pub schema: &'a MetricSchema,
    /// labels contributed by the mapping itself
    pub fixed_labels: &'a BTreeMap<String, String>,
}

/// the two ignore tiers of a family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnorePolicy {
    global: HashSet<String>,
    subnet: HashSet<String>,
}

impl IgnorePolicy {
    /// names that are redundant at global granularity
    pub fn is_globally_ignored(&self, name: &str) -> bool {
        self.global.contains(name)
    }

    /// names that are redundant at subnet/pool granularity
    pub fn is_subnet_ignored(&self, name: &str) -> bool {
        self.subnet.contains(name)
    }
}

/// immutable statistics catalog for one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    family: Family,
    metrics: BTreeMap<String, MetricSchema>,
    mappings: HashMap<String, Mapping>,
    ignore: IgnorePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mapping {
    metric: String,
    labels: BTreeMap<String, String>,
}

/// errors loading a catalog table
#[derive(Error, Debug)]
pub enum CatalogError {
    /// table file could not be read
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        /// table path
        path: PathBuf,
        /// underlying error
        source: std::io::Error,
    },
    /// table is not valid yaml for the expected shape
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// table was written for the other family
    #[error("catalog is for {found} but {expected} was expected")]
    FamilyMismatch {
        /// family the catalog was loaded for
        expected: Family,
        /// family declared in the table
        found: Family,
    },
    /// a mapping points at a metric id that isn't declared
    #[error("mapping {mapping:?} refers to undeclared metric {metric:?}")]
    UnknownMetric {
        /// bare statistic name
        mapping: String,
        /// missing metric id
        metric: String,
    },
    /// a mapping sets a fixed label the target metric doesn't declare
    #[error("mapping {mapping:?} sets label {label:?} which metric {metric:?} does not declare")]
    UndeclaredLabel {
        /// bare statistic name
        mapping: String,
        /// offending label
        label: String,
        /// target metric id
        metric: String,
    },
    /// metric or label name that prometheus would reject
    #[error("invalid {what} name {name:?}")]
    InvalidName {
        /// "metric" or "label"
        what: &'static str,
        /// offending name
        name: String,
    },
}

impl Catalog {
    /// catalog compiled into the binary
    pub fn builtin(family: Family) -> Result<Self, CatalogError> {
        let table = match family {
            Family::Dhcp4 => DHCP4_TABLE,
            Family::Dhcp6 => DHCP6_TABLE,
        };
        Self::from_yaml(family, table)
    }

    /// load a catalog table from disk
    pub fn from_path<P: AsRef<Path>>(family: Family, path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let table = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(%family, path = %path.display(), "loading catalog from file");
        Self::from_yaml(family, table)
    }

    /// parse and validate a catalog table
    pub fn from_yaml<S: AsRef<str>>(family: Family, table: S) -> Result<Self, CatalogError> {
        let table: wire::Table = serde_yaml::from_str(table.as_ref())?;
        if table.family != family {
            return Err(CatalogError::FamilyMismatch {
                expected: family,
                found: table.family,
            });
        }

        let metrics = table
            .metrics
            .into_iter()
            .map(|(id, m)| {
                let name = format!("{}_{}", table.prefix, m.name);
                valid_name("metric", &name, true)?;
                for label in &m.labels {
                    valid_name("label", label, false)?;
                }
                Ok((
                    id.clone(),
                    MetricSchema {
                        id,
                        name,
                        help: m.help,
                        kind: m.kind,
                        labels: m.labels,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, CatalogError>>()?;

        let mappings = table
            .mappings
            .into_iter()
            .map(|(stat, m)| {
                let schema = metrics
                    .get(&m.metric)
                    .ok_or_else(|| CatalogError::UnknownMetric {
                        mapping: stat.clone(),
                        metric: m.metric.clone(),
                    })?;
                if let Some(label) = m.labels.keys().find(|l| !schema.declares(l)) {
                    return Err(CatalogError::UndeclaredLabel {
                        mapping: stat.clone(),
                        label: label.clone(),
                        metric: m.metric.clone(),
                    });
                }
                Ok((
                    stat,
                    Mapping {
                        metric: m.metric,
                        labels: m.labels,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, CatalogError>>()?;

        Ok(Self {
            family,
            metrics,
            mappings,
            ignore: IgnorePolicy {
                global: table.ignore.global.into_iter().collect(),
                subnet: table.ignore.subnet.into_iter().collect(),
            },
        })
    }

    /// family this catalog describes
    pub fn family(&self) -> Family {
        self.family
    }

    /// look up the output metric for a bare statistic name
    pub fn map_metric(&self, name: &str) -> Option<MappedMetric<'_>> {
        let mapping = self.mappings.get(name)?;
        // validated at load
        let schema = self.metrics.get(&mapping.metric)?;
        Some(MappedMetric {
            schema,
            fixed_labels: &mapping.labels,
        })
    }

    /// see [`IgnorePolicy::is_globally_ignored`]
    pub fn is_globally_ignored(&self, name: &str) -> bool {
        self.ignore.is_globally_ignored(name)
    }

    /// see [`IgnorePolicy::is_subnet_ignored`]
    pub fn is_subnet_ignored(&self, name: &str) -> bool {
        self.ignore.is_subnet_ignored(name)
    }

    /// schema of an output metric by id
    pub fn metric(&self, id: &str) -> Option<&MetricSchema> {
        self.metrics.get(id)
    }

    /// all output metrics, ordered by id
    pub fn metrics(&self) -> impl Iterator<Item = &MetricSchema> {
        self.metrics.values()
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} catalog ({} metrics, {} mappings)",
            self.family,
            self.metrics.len(),
            self.mappings.len()
        )
    }
}

/// prometheus names: `[a-zA-Z_:][a-zA-Z0-9_:]*`, labels may not contain `:`
fn valid_name(what: &'static str, name: &str, allow_colon: bool) -> Result<(), CatalogError> {
    let ok_char = |c: char, first: bool| {
        c.is_ascii_alphabetic()
            || c == '_'
            || (allow_colon && c == ':')
            || (!first && c.is_ascii_digit())
    };
    let mut chars = name.chars();
    let valid =
        chars.next().is_some_and(|c| ok_char(c, true)) && chars.all(|c| ok_char(c, false));
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidName {
            what,
            name: name.to_owned(),
        })
    }
}

mod wire {
    //! on-disk table layout
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::Kind;
    use crate::family::Family;

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    pub(super) struct Table {
        pub(super) family: Family,
        pub(super) prefix: String,
        pub(super) metrics: BTreeMap<String, Metric>,
        #[serde(default)]
        pub(super) mappings: BTreeMap<String, Mapping>,
        #[serde(default)]
        pub(super) ignore: Ignore,
    }

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    pub(super) struct Metric {
        pub(super) name: String,
        pub(super) help: String,
        pub(super) kind: Kind,
        #[serde(default)]
        pub(super) labels: Vec<String>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    pub(super) struct Mapping {
        pub(super) metric: String,
        #[serde(default)]
        pub(super) labels: BTreeMap<String, String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(deny_unknown_fields)]
    pub(super) struct Ignore {
        #[serde(default)]
        pub(super) global: Vec<String>,
        #[serde(default)]
        pub(super) subnet: Vec<String>,
    }
}
