use proptest::prelude::*;

use kea_stats::DecodedKey;

fn metric_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,30}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn pool_keys_decode(subnet in any::<u32>(), pool in 0usize..4096, metric in metric_name()) {
        let key = format!("subnet[{subnet}].pool[{pool}].{metric}");
        prop_assert_eq!(
            DecodedKey::decode(&key),
            DecodedKey::SubnetPool { subnet_id: subnet, pool_index: pool, metric: &metric }
        );
    }

    #[test]
    fn subnet_keys_decode(subnet in any::<u32>(), metric in metric_name()) {
        let key = format!("subnet[{subnet}].{metric}");
        prop_assert_eq!(
            DecodedKey::decode(&key),
            DecodedKey::Subnet { subnet_id: subnet, metric: &metric }
        );
    }

    #[test]
    fn other_keys_are_global(metric in metric_name()) {
        prop_assume!(!metric.starts_with("subnet"));
        prop_assert_eq!(DecodedKey::decode(&metric), DecodedKey::Global(&metric));
    }

    #[test]
    fn decode_never_panics(key in "\\PC{0,64}") {
        let decoded = DecodedKey::decode(&key);
        prop_assert!(key.ends_with(decoded.metric()));
    }
}
