//! # key
//!
//! Decodes a raw statistic key into the location it describes. Kea encodes
//! the location in the key itself:
//!
//! ```text
//! pkt4-received                      global
//! subnet[3].assigned-addresses       subnet 3
//! subnet[3].pool[0].total-addresses  first pool of subnet 3
//! ```
//!
//! The pool index is a position in the subnet's configured pool list, not a
//! pool id. Anything that doesn't fit the subnet grammar is global, decoding
//! never fails.

/// where a statistic lives and its bare metric name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodedKey<'a> {
    /// server wide statistic
    Global(&'a str),
    /// per subnet statistic
    Subnet {
        /// configured subnet id
        subnet_id: u32,
        /// bare metric name
        metric: &'a str,
    },
    /// per pool statistic
    SubnetPool {
        /// configured subnet id
        subnet_id: u32,
        /// zero-based position in the subnet's pool list
        pool_index: usize,
        /// bare metric name
        metric: &'a str,
    },
}

impl<'a> DecodedKey<'a> {
    /// decode a raw key
    pub fn decode(key: &'a str) -> Self {
        subnet_key(key).unwrap_or(DecodedKey::Global(key))
    }

    /// the bare metric name with any subnet/pool prefix removed
    pub fn metric(&self) -> &'a str {
        match *self {
            DecodedKey::Global(metric)
            | DecodedKey::Subnet { metric, .. }
            | DecodedKey::SubnetPool { metric, .. } => metric,
        }
    }

    /// true if the key was not scoped to a subnet
    pub fn is_global(&self) -> bool {
        matches!(self, DecodedKey::Global(_))
    }
}

fn subnet_key(key: &str) -> Option<DecodedKey<'_>> {
    let (subnet_id, rest) = indexed(key, "subnet")?;
    let rest = rest.strip_prefix('.')?;
    match indexed(rest, "pool") {
        Some((pool_index, rest)) => {
            let metric = metric_name(rest.strip_prefix('.')?)?;
            Some(DecodedKey::SubnetPool {
                subnet_id,
                pool_index,
                metric,
            })
        }
        None => Some(DecodedKey::Subnet {
            subnet_id,
            metric: metric_name(rest)?,
        }),
    }
}

/// parses `<name>[<digits>]`, returning the number and the remainder
fn indexed<'a, T: std::str::FromStr>(s: &'a str, name: &str) -> Option<(T, &'a str)> {
    let s = s.strip_prefix(name)?.strip_prefix('[')?;
    let end = s.find(']')?;
    let digits = &s[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, &s[end + 1..]))
}

/// metric names are word characters and dashes
fn metric_name(s: &str) -> Option<&str> {
    let valid = !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    valid.then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_keys() {
        assert_eq!(
            DecodedKey::decode("pkt4-ack-sent"),
            DecodedKey::Global("pkt4-ack-sent")
        );
        assert!(DecodedKey::decode("pkt4-ack-sent").is_global());
    }

    #[test]
    fn subnet_keys() {
        assert_eq!(
            DecodedKey::decode("subnet[12].assigned-addresses"),
            DecodedKey::Subnet {
                subnet_id: 12,
                metric: "assigned-addresses"
            }
        );
    }

    #[test]
    fn pool_keys() {
        let key = DecodedKey::decode("subnet[7].pool[1].total-addresses");
        assert_eq!(
            key,
            DecodedKey::SubnetPool {
                subnet_id: 7,
                pool_index: 1,
                metric: "total-addresses"
            }
        );
        assert_eq!(key.metric(), "total-addresses");
    }

    #[test]
    fn malformed_keys_fall_back_to_global() {
        for key in [
            "subnet[].total-addresses",
            "subnet[-1].total-addresses",
            "subnet[1]total-addresses",
            "subnet[1].",
            "subnet[1].pool[x].total-addresses",
            "subnet[1].pool[0].",
            "subnet[1].pd-pool[0].assigned-pds",
            "subnet[1].pool[0].a.b",
            "subnet[99999999999].total-addresses",
        ] {
            assert_eq!(DecodedKey::decode(key), DecodedKey::Global(key), "{key}");
        }
    }
}
