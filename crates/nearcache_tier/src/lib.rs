// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions shared by the near cache crates.
//!
//! A near cache keeps a bounded local mirror of a remote, authoritative cache. This crate
//! defines the vocabulary both sides speak:
//!
//! - [`VersionedValue`] and [`Version`]: a value paired with the server-issued version token
//! - [`LocalTier`]: the bounded, per-key atomic local store
//! - [`RemoteCache`]: the remote operation facade a near cache decorates
//! - [`KeyBytes`] and [`HashFamily`]: the canonical key form and the pluggable hash primitive
//!   used by membership filters
//! - [`FilterSnapshot`]: the immutable filter image pushed to the server
//! - [`Error`]: the opaque error type of remote operations
//!
//! # Implementing a Local Tier
//!
//! ```
//! use nearcache_tier::{LocalTier, VersionedValue};
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! struct SimpleTier<V>(Mutex<HashMap<String, VersionedValue<V>>>);
//!
//! impl<V: Clone + Send> LocalTier<String, V> for SimpleTier<V> {
//!     fn get(&self, key: &String) -> Option<VersionedValue<V>> {
//!         self.0.lock().unwrap().get(key).cloned()
//!     }
//!
//!     fn put(&self, key: String, value: VersionedValue<V>) {
//!         self.0.lock().unwrap().insert(key, value);
//!     }
//!
//!     fn put_if_absent(&self, key: String, value: VersionedValue<V>) -> bool {
//!         let mut map = self.0.lock().unwrap();
//!         if map.contains_key(&key) {
//!             return false;
//!         }
//!         map.insert(key, value);
//!         true
//!     }
//!
//!     fn remove(&self, key: &String) -> bool {
//!         self.0.lock().unwrap().remove(key).is_some()
//!     }
//!
//!     fn clear(&self) {
//!         self.0.lock().unwrap().clear();
//!     }
//!
//!     fn len(&self) -> u64 {
//!         self.0.lock().unwrap().len() as u64
//!     }
//!
//!     fn keys(&self) -> Vec<String> {
//!         self.0.lock().unwrap().keys().cloned().collect()
//!     }
//! }
//! ```

mod capacity;
pub mod error;
mod hash;
mod key;
mod local;
mod remote;
mod snapshot;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod value;

#[doc(inline)]
pub use capacity::Capacity;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use hash::{HashFamily, bit_position};
#[doc(inline)]
pub use key::KeyBytes;
#[doc(inline)]
pub use local::LocalTier;
#[doc(inline)]
pub use remote::RemoteCache;
#[doc(inline)]
pub use snapshot::FilterSnapshot;
#[doc(inline)]
pub use value::{Version, VersionedValue};
