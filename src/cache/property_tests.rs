//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check eviction order, capacity, statistics and
//! serializer behavior over generated operation sequences.

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheStore, JsonValue, SecretKey, SecureSerializer, TtlCache};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

fn secret() -> SecretKey {
    SecretKey::new("property-test-secret-key-0123456789").unwrap()
}

fn new_store(max_entries: usize) -> CacheStore {
    CacheStore::new(max_entries, None, SecureSerializer::new(secret()))
}

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}"
}

/// Arbitrary JSON documents of bounded depth.
fn json_strategy() -> impl Strategy<Value = JsonValue> {
    let leaf = prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::from),
        any::<i64>().prop_map(JsonValue::from),
        (-1.0e12f64..1.0e12).prop_map(JsonValue::from),
        "[a-zA-Z0-9 ]{0,32}".prop_map(JsonValue::from),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(JsonValue::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|map| JsonValue::Object(map.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: JsonValue },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), json_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence, counters match what the caller observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        let mut expected = (0u64, 0u64, 0u64, 0u64);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(&key, &value, None).unwrap();
                    expected.2 += 1;
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected.0 += 1,
                    None => expected.1 += 1,
                },
                CacheOp::Delete { key } => {
                    if store.delete(&key) {
                        expected.3 += 1;
                    }
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected.0, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected.1, "Misses mismatch");
        prop_assert_eq!(stats.sets, expected.2, "Sets mismatch");
        prop_assert_eq!(stats.deletes, expected.3, "Deletes mismatch");
        prop_assert_eq!(stats.current_size, store.len());
    }

    // Any JSON value survives serialize/deserialize unchanged.
    #[test]
    fn prop_serializer_round_trip(key in valid_key_strategy(), data in json_strategy(), compress in any::<bool>()) {
        let serializer = SecureSerializer::new(secret()).with_compression(compress, 0);
        let blob = serializer.serialize(&key, &data, Some(Duration::from_secs(60))).unwrap();
        prop_assert_eq!(serializer.deserialize(&blob).unwrap(), data);
    }

    // Flipping any byte of an uncompressed blob never yields different data.
    #[test]
    fn prop_tampering_never_returns_altered_data(data in json_strategy(), index in any::<prop::sample::Index>()) {
        let serializer = SecureSerializer::new(secret());
        let mut blob = serializer.serialize("doc", &data, None).unwrap();
        let i = index.index(blob.len());
        blob[i] ^= 0x01;

        match serializer.deserialize(&blob) {
            Ok(value) => prop_assert_eq!(value, data),
            Err(err) => prop_assert!(matches!(
                err,
                CacheError::Security(_) | CacheError::Validation(_)
            )),
        }
    }

    // Storing then reading returns the same value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in json_strategy()) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        store.set(&key, &value, None).unwrap();
        prop_assert_eq!(store.get(&key), Some(value));
    }

    // A second set of the same key wins.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in json_strategy(),
        value2 in json_strategy()
    ) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        store.set(&key, &value1, None).unwrap();
        store.set(&key, &value2, None).unwrap();

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1);
    }

    // The entry count never exceeds capacity.
    #[test]
    fn prop_capacity_enforcement(keys in prop::collection::vec(valid_key_strategy(), 1..200)) {
        let max_entries = 50;
        let mut store = new_store(max_entries);

        for key in keys {
            store.set(&key, &json!(key.len()), None).unwrap();
            prop_assert!(store.len() <= max_entries);
        }
    }

    // The evicted key is always the least recently touched one.
    #[test]
    fn prop_lru_matches_reference_model(
        ops in prop::collection::vec((0usize..12, any::<bool>()), 1..120)
    ) {
        let capacity = 4;
        let mut store = new_store(capacity);
        let mut model: Vec<String> = Vec::new();

        for (n, is_get) in ops {
            let key = format!("k{}", n);
            if is_get {
                if store.get(&key).is_some() {
                    model.retain(|k| k != &key);
                    model.push(key);
                }
            } else {
                store.set(&key, &json!(n), None).unwrap();
                if model.contains(&key) {
                    model.retain(|k| k != &key);
                } else if model.len() == capacity {
                    model.remove(0);
                }
                model.push(key);
            }
            prop_assert_eq!(store.keys(), model.clone());
        }
    }

    // Touching the oldest key spares it from the next eviction.
    #[test]
    fn prop_lru_access_tracking(keys in prop::collection::vec(valid_key_strategy(), 3..8)) {
        let unique_keys: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique_keys.len() >= 3);

        let mut store = new_store(unique_keys.len());
        for key in &unique_keys {
            store.set(key, &json!(key), None).unwrap();
        }

        prop_assert!(store.get(&unique_keys[0]).is_some());
        store.set("fresh-key", &json!(0), None).unwrap();

        prop_assert!(store.exists(&unique_keys[0]));
        prop_assert!(!store.exists(&unique_keys[1]));
        prop_assert!(store.exists("fresh-key"));
    }
}

// Fewer cases for time-sensitive TTL checks
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // After the TTL elapses, get returns nothing.
    #[test]
    fn prop_ttl_expiration_behavior(key in valid_key_strategy(), value in json_strategy()) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        store.set(&key, &value, Some(Duration::from_millis(100))).unwrap();

        prop_assert_eq!(store.get(&key), Some(value));

        sleep(Duration::from_millis(150));

        prop_assert_eq!(store.get(&key), None);
        prop_assert!(!store.exists(&key));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Concurrent tasks never read a value that was not written for that key.
    #[test]
    fn prop_concurrent_operation_correctness(
        operations in prop::collection::vec(cache_op_strategy(), 10..50)
    ) {
        tokio_test::block_on(async {
            let cache = TtlCache::new(new_store(16));
            let mut handles = Vec::new();

            for op in operations {
                let cache = cache.clone();
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Set { key, value } => {
                            cache.set(&key, &json!({"key": key, "value": value}), None).await.unwrap();
                            Ok(())
                        }
                        CacheOp::Get { key } => match cache.get(&key).await {
                            Some(found) if found["key"] != json!(key) => {
                                Err(format!("read value written for another key: {}", found))
                            }
                            _ => Ok(()),
                        },
                        CacheOp::Delete { key } => {
                            cache.delete(&key).await;
                            Ok(())
                        }
                    }
                }));
            }

            for handle in handles {
                let result = handle.await.expect("task should not panic");
                prop_assert!(result.is_ok(), "Concurrent operation failed: {:?}", result);
            }

            let stats = cache.stats().await;
            prop_assert!(stats.current_size <= 16);
            prop_assert!((0.0..=1.0).contains(&stats.hit_rate));
            Ok(())
        })?;
    }
}
