//! # subnets
//!
//! Index of the subnet/pool identities from the last configuration fetched
//! from a target. It is never patched: a refresh builds a new [`SubnetIndex`]
//! and the owner swaps it in, a failed refresh leaves the old one in place.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// a configured subnet and its pools, in configuration order
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetConfig {
    /// subnet id, unique within a family
    pub id: u32,
    /// subnet prefix as written in the config, used as the `subnet` label
    pub label: String,
    /// pool labels; `pool[N]` in statistic keys is a position in this list
    pub pools: Vec<String>,
}

impl SubnetConfig {
    /// create a new subnet entry
    pub fn new<S, I, P>(id: u32, label: S, pools: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            id,
            label: label.into(),
            pools: pools.into_iter().map(Into::into).collect(),
        }
    }
}

/// lookup from subnet id to subnet/pool labels for one family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetIndex {
    subnets: HashMap<u32, SubnetConfig>,
}

impl SubnetIndex {
    /// build an index from a full configuration. If the configuration lists
    /// an id twice the last entry wins.
    pub fn new<I>(subnets: I) -> Self
    where
        I: IntoIterator<Item = SubnetConfig>,
    {
        Self {
            subnets: subnets.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// label and pools of a subnet, `None` if it is not configured
    pub fn resolve_subnet(&self, id: u32) -> Option<&SubnetConfig> {
        self.subnets.get(&id)
    }

    /// pool label at `index` of subnet `id`, `None` if the subnet is missing
    /// or the index is past the end of its pool list
    pub fn resolve_pool(&self, id: u32, index: usize) -> Option<&str> {
        self.resolve_subnet(id)?.pools.get(index).map(String::as_str)
    }

    /// number of subnets in the index
    pub fn len(&self) -> usize {
        self.subnets.len()
    }

    /// true if the configuration had no subnets
    pub fn is_empty(&self) -> bool {
        self.subnets.is_empty()
    }
}

impl FromIterator<SubnetConfig> for SubnetIndex {
    fn from_iter<T: IntoIterator<Item = SubnetConfig>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SubnetIndex {
        SubnetIndex::new([
            SubnetConfig::new(
                7,
                "10.0.0.0/24",
                ["10.0.0.1-10.0.0.50", "10.0.0.51-10.0.0.100"],
            ),
            SubnetConfig::new(8, "10.0.1.0/24", Vec::<String>::new()),
        ])
    }

    #[test]
    fn resolves_subnets_and_pools() {
        let idx = index();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.resolve_subnet(7).unwrap().label, "10.0.0.0/24");
        assert_eq!(idx.resolve_pool(7, 1), Some("10.0.0.51-10.0.0.100"));
        assert_eq!(idx.resolve_pool(7, 0), Some("10.0.0.1-10.0.0.50"));
    }

    #[test]
    fn missing_references() {
        let idx = index();
        assert!(idx.resolve_subnet(5).is_none());
        assert!(idx.resolve_pool(5, 0).is_none());
        // config shrank
        assert!(idx.resolve_pool(7, 2).is_none());
        assert!(idx.resolve_pool(8, 0).is_none());
    }
}
