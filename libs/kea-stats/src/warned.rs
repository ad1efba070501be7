//! warn-once bookkeeping for pipeline diagnostics
use std::{collections::HashSet, fmt};

use parking_lot::Mutex;

use crate::family::Family;

/// a condition the pipeline reports once per process lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// statistic name missing from the catalog
    Unmapped {
        /// bare metric name
        metric: String,
    },
    /// statistic references a subnet id not in the configuration
    VanishedSubnet {
        /// family of the snapshot
        family: Family,
        /// subnet id from the key
        subnet_id: u32,
    },
    /// statistic references a pool position past the subnet's pool list
    VanishedPool {
        /// family of the snapshot
        family: Family,
        /// subnet id from the key
        subnet_id: u32,
        /// pool position from the key
        pool_index: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unmapped { metric } => write!(f, "unhandled metric {metric:?}"),
            Diagnostic::VanishedSubnet { family, subnet_id } => {
                write!(f, "{family} subnet {subnet_id} vanished from configuration")
            }
            Diagnostic::VanishedPool {
                family,
                subnet_id,
                pool_index,
            } => write!(
                f,
                "{family} subnet {subnet_id} pool {pool_index} vanished from configuration"
            ),
        }
    }
}

/// Diagnostics already reported. Shared by all targets and never cleared, so
/// a subnet that disappears, comes back and disappears again is only
/// reported the first time, and the same condition on two targets is only
/// reported for the first one.
#[derive(Debug, Default)]
pub struct WarnedSet {
    seen: Mutex<HashSet<Diagnostic>>,
}

impl WarnedSet {
    /// empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// record `diag`, returning true if this is the first time it was seen
    pub fn first(&self, diag: &Diagnostic) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains(diag) {
            false
        } else {
            seen.insert(diag.clone());
            true
        }
    }

    /// true if `diag` was already reported
    pub fn contains(&self, diag: &Diagnostic) -> bool {
        self.seen.lock().contains(diag)
    }

    /// number of distinct diagnostics reported so far
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// true if nothing was reported yet
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once() {
        let set = WarnedSet::new();
        let diag = Diagnostic::VanishedSubnet {
            family: Family::Dhcp4,
            subnet_id: 5,
        };
        assert!(set.first(&diag));
        assert!(!set.first(&diag));
        assert!(set.contains(&diag));
        // same id in the other family is a separate condition
        assert!(set.first(&Diagnostic::VanishedSubnet {
            family: Family::Dhcp6,
            subnet_id: 5,
        }));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        let diag = Diagnostic::VanishedPool {
            family: Family::Dhcp6,
            subnet_id: 1,
            pool_index: 3,
        };
        assert_eq!(
            diag.to_string(),
            "dhcp6 subnet 1 pool 3 vanished from configuration"
        );
    }
}
