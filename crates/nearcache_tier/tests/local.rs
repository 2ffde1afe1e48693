// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `LocalTier` default implementations and pointer delegation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nearcache_tier::{LocalTier, Version, VersionedValue};

/// Minimal implementation that only provides required methods
struct MinimalTier {
    data: Mutex<HashMap<String, VersionedValue<i32>>>,
}

impl MinimalTier {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl LocalTier<String, i32> for MinimalTier {
    fn get(&self, key: &String) -> Option<VersionedValue<i32>> {
        self.data.lock().expect("lock poisoned").get(key).cloned()
    }

    fn put(&self, key: String, value: VersionedValue<i32>) {
        self.data.lock().expect("lock poisoned").insert(key, value);
    }

    fn put_if_absent(&self, key: String, value: VersionedValue<i32>) -> bool {
        let mut data = self.data.lock().expect("lock poisoned");
        if data.contains_key(&key) {
            return false;
        }
        data.insert(key, value);
        true
    }

    fn remove(&self, key: &String) -> bool {
        self.data.lock().expect("lock poisoned").remove(key).is_some()
    }

    fn clear(&self) {
        self.data.lock().expect("lock poisoned").clear();
    }

    fn len(&self) -> u64 {
        self.data.lock().expect("lock poisoned").len() as u64
    }

    fn keys(&self) -> Vec<String> {
        self.data.lock().expect("lock poisoned").keys().cloned().collect()
    }
}

fn versioned(value: i32) -> VersionedValue<i32> {
    VersionedValue::new(value, Version::new(1))
}

#[test]
fn minimal_tier_defaults() {
    let tier = MinimalTier::new();
    assert!(tier.is_empty());
    assert_eq!(tier.evictions(), 0);

    tier.put("a".to_string(), versioned(1));
    assert!(!tier.is_empty());
}

#[test]
fn put_if_absent_keeps_existing_value() {
    let tier = MinimalTier::new();
    assert!(tier.put_if_absent("a".to_string(), versioned(1)));
    assert!(!tier.put_if_absent("a".to_string(), versioned(2)));
    assert_eq!(*tier.get(&"a".to_string()).expect("present").value(), 1);
}

#[test]
fn boxed_dyn_tier_delegates() {
    let tier: Box<dyn LocalTier<String, i32>> = Box::new(MinimalTier::new());
    tier.put("a".to_string(), versioned(1));
    tier.put("b".to_string(), versioned(2));

    assert_eq!(tier.len(), 2);
    assert!(tier.remove(&"a".to_string()));
    assert!(!tier.remove(&"a".to_string()));

    let keys = tier.keys();
    assert_eq!(keys, vec!["b".to_string()]);

    tier.clear();
    assert!(tier.is_empty());
}

#[test]
fn arc_tier_shares_state() {
    let tier = Arc::new(MinimalTier::new());
    let other = Arc::clone(&tier);

    LocalTier::put(&tier, "k".to_string(), versioned(3));
    assert_eq!(LocalTier::get(&other, &"k".to_string()).map(VersionedValue::into_value), Some(3));
}
