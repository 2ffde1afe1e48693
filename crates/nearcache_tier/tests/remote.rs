// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `RemoteCache` default implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use nearcache_tier::{Error, FilterSnapshot, RemoteCache, Version, VersionedValue};

/// Minimal server that versions every write with a counter
struct MinimalRemote {
    data: Mutex<HashMap<String, VersionedValue<i32>>>,
    next_version: Mutex<u64>,
}

impl MinimalRemote {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            next_version: Mutex::new(1),
        }
    }

    fn version(&self) -> Version {
        let mut next = self.next_version.lock().expect("lock poisoned");
        let version = Version::new(*next);
        *next += 1;
        version
    }
}

impl RemoteCache<String, i32> for MinimalRemote {
    async fn get(&self, key: &String) -> Result<Option<VersionedValue<i32>>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: String, value: i32) -> Result<(), Error> {
        let version = self.version();
        self.data
            .lock()
            .expect("lock poisoned")
            .insert(key, VersionedValue::new(value, version));
        Ok(())
    }

    async fn put_if_absent(&self, key: String, value: i32) -> Result<bool, Error> {
        let version = self.version();
        let mut data = self.data.lock().expect("lock poisoned");
        if data.contains_key(&key) {
            return Ok(false);
        }
        data.insert(key, VersionedValue::new(value, version));
        Ok(true)
    }

    async fn replace(&self, key: String, value: i32) -> Result<bool, Error> {
        let version = self.version();
        let mut data = self.data.lock().expect("lock poisoned");
        match data.get_mut(&key) {
            Some(slot) => {
                *slot = VersionedValue::new(value, version);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_with_version(&self, key: String, value: i32, expected: Version) -> Result<bool, Error> {
        let version = self.version();
        let mut data = self.data.lock().expect("lock poisoned");
        match data.get_mut(&key) {
            Some(slot) if slot.version() == expected => {
                *slot = VersionedValue::new(value, version);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, key: &String) -> Result<bool, Error> {
        Ok(self.data.lock().expect("lock poisoned").remove(key).is_some())
    }

    async fn remove_with_version(&self, key: &String, expected: Version) -> Result<bool, Error> {
        let mut data = self.data.lock().expect("lock poisoned");
        if data.get(key).is_some_and(|current| current.version() == expected) {
            data.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn clear(&self) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").clear();
        Ok(())
    }
}

#[tokio::test]
async fn default_filter_update_is_noop() {
    let remote = MinimalRemote::new();
    let snapshot = FilterSnapshot::new(0, 3, 64, vec![0]);
    remote
        .update_membership_filter(snapshot)
        .await
        .expect("default filter update should succeed");
}

#[tokio::test]
async fn versioned_remove_requires_matching_version() {
    let remote = MinimalRemote::new();
    remote.put("k".to_string(), 1).await.expect("put");
    let current = remote.get(&"k".to_string()).await.expect("get").expect("present");

    let stale = Version::new(current.version().get() + 10);
    assert!(!remote.remove_with_version(&"k".to_string(), stale).await.expect("remove"));
    assert!(
        remote
            .remove_with_version(&"k".to_string(), current.version())
            .await
            .expect("remove")
    );
}

#[tokio::test]
async fn replace_with_version_rejects_stale_token() {
    let remote = MinimalRemote::new();
    remote.put("k".to_string(), 1).await.expect("put");
    let first = remote.get(&"k".to_string()).await.expect("get").expect("present").version();

    assert!(remote.replace_with_version("k".to_string(), 2, first).await.expect("replace"));
    assert!(!remote.replace_with_version("k".to_string(), 3, first).await.expect("replace"));
    assert!(!remote.replace("missing".to_string(), 1).await.expect("replace"));
    assert!(!remote.put_if_absent("k".to_string(), 9).await.expect("put_if_absent"));
}
