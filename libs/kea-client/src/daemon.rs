//! Subnet/pool extraction from a daemon's `config-get` output.
//!
//! Only `id`, `subnet` and `pools[].pool` matter here; everything else in
//! the configuration is ignored.
use kea_stats::{Family, SubnetConfig};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// subnets of one family as configured on the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyConfig {
    /// daemon family
    pub family: Family,
    /// top-level and shared-network subnets, in configuration order
    pub subnets: Vec<SubnetConfig>,
}

#[derive(Deserialize, Debug)]
struct Subnet {
    id: u32,
    subnet: String,
    #[serde(default)]
    pools: Vec<Pool>,
}

#[derive(Deserialize, Debug)]
struct Pool {
    pool: String,
}

impl From<Subnet> for SubnetConfig {
    fn from(subnet: Subnet) -> Self {
        SubnetConfig::new(
            subnet.id,
            subnet.subnet,
            subnet.pools.into_iter().map(|p| p.pool),
        )
    }
}

fn subnets(family: Family, scope: &Value) -> ClientResult<Vec<SubnetConfig>> {
    match scope.get(family.subnet_key()) {
        Some(list) => Ok(Vec::<Subnet>::deserialize(list)?
            .into_iter()
            .map(SubnetConfig::from)
            .collect()),
        None => Ok(Vec::new()),
    }
}

/// Finds the `Dhcp4` or `Dhcp6` object in a `config-get` result and returns
/// its subnets, including those declared inside `shared-networks`.
pub fn parse_config(arguments: &Value) -> ClientResult<FamilyConfig> {
    let (family, daemon) = Family::ALL
        .into_iter()
        .find_map(|family| Some((family, arguments.get(family.config_key())?)))
        .ok_or(ClientError::NoDhcpConfig)?;

    let mut all = subnets(family, daemon)?;
    if let Some(Value::Array(networks)) = daemon.get("shared-networks") {
        for network in networks {
            all.extend(subnets(family, network)?);
        }
    }
    Ok(FamilyConfig {
        family,
        subnets: all,
    })
}
