//! DHCP protocol family

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The protocol family a statistics namespace belongs to. Subnet ids are only
/// unique within one family, so most per-target state is kept per family.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// DHCPv4 (`Dhcp4` config, `subnet4` list)
    Dhcp4,
    /// DHCPv6 (`Dhcp6` config, `subnet6` list)
    Dhcp6,
}

impl Family {
    /// both families, in the order they are polled
    pub const ALL: [Family; 2] = [Family::Dhcp4, Family::Dhcp6];

    /// service name used by the kea control agent
    pub const fn service(self) -> &'static str {
        match self {
            Family::Dhcp4 => "dhcp4",
            Family::Dhcp6 => "dhcp6",
        }
    }

    /// top-level key of the daemon configuration in a `config-get` response
    pub const fn config_key(self) -> &'static str {
        match self {
            Family::Dhcp4 => "Dhcp4",
            Family::Dhcp6 => "Dhcp6",
        }
    }

    /// key of the subnet list inside the daemon configuration
    pub const fn subnet_key(self) -> &'static str {
        match self {
            Family::Dhcp4 => "subnet4",
            Family::Dhcp6 => "subnet6",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}

impl FromStr for Family {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dhcp4" => Ok(Family::Dhcp4),
            "dhcp6" => Ok(Family::Dhcp6),
            other => Err(UnknownFamily(other.to_owned())),
        }
    }
}

/// service name that isn't a DHCP family (e.g. `d2`)
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown protocol family {0:?}")]
pub struct UnknownFamily(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_round_trip() {
        for family in Family::ALL {
            assert_eq!(family.service().parse::<Family>().unwrap(), family);
        }
        assert!("d2".parse::<Family>().is_err());
    }
}
