// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-memory local tier backed by moka.
//!
//! This crate provides [`InMemoryTier`], the default [`LocalTier`](nearcache_tier::LocalTier)
//! of a near cache. It evicts least recently used entries once the configured
//! [`Capacity`](nearcache_tier::Capacity) is exceeded and counts how many entries it evicted.
//! Use [`InMemoryTierBuilder`] to configure it without exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use nearcache_memory::InMemoryTier;
//! use nearcache_tier::{Capacity, LocalTier, Version, VersionedValue};
//!
//! let tier = InMemoryTier::<String, i32>::builder()
//!     .capacity(Capacity::Bounded(1000))
//!     .build();
//!
//! assert!(tier.put_if_absent("key".to_string(), VersionedValue::new(42, Version::new(1))));
//! let value = tier.get(&"key".to_string());
//! assert_eq!(value.map(VersionedValue::into_value), Some(42));
//! ```
//!
//! The tier is synchronous, so invalidation events can be applied from any thread without an
//! async runtime.

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryTierBuilder;
#[doc(inline)]
pub use tier::InMemoryTier;
